use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get};
use axum::{Json, Router};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::task::JoinHandle;

use crate::get_unused_addr;

#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
/// A member as served by the fake members API.
pub struct FakeMember {
    pub id: String,
    pub name: String,
    #[serde(rename = "peerURLs")]
    pub peer_urls: Vec<String>,
    #[serde(rename = "clientURLs")]
    pub client_urls: Vec<String>,
}

impl FakeMember {
    pub fn new(id: impl Into<String>, name: impl Into<String>, peer_url: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            peer_urls: vec![peer_url.into()],
            client_urls: Vec::new(),
        }
    }
}

#[derive(Debug, Default)]
struct FakeState {
    members: Vec<FakeMember>,
    requests: Vec<String>,
    next_id: u64,
    forced_status: Option<StatusCode>,
}

type Shared = Arc<Mutex<FakeState>>;

/// An in-process server speaking the subset of the etcd v2 members API
/// used during bootstrap.
///
/// The server stops when the handle is dropped.
pub struct FakeEtcd {
    addr: SocketAddr,
    state: Shared,
    handle: JoinHandle<()>,
}

impl FakeEtcd {
    /// Starts a new server with the given members.
    ///
    /// This must be called from within a tokio runtime.
    pub fn spawn(members: Vec<FakeMember>) -> Self {
        let addr = get_unused_addr();
        let state = Arc::new(Mutex::new(FakeState {
            members,
            next_id: 0x1000,
            ..Default::default()
        }));

        let app = Router::new()
            .route("/v2/members", get(list_members).post(add_member))
            .route("/v2/members/:id", delete(remove_member))
            .with_state(state.clone());

        let server = axum::Server::bind(&addr).serve(app.into_make_service());
        let handle = tokio::spawn(async move {
            let _ = server.await;
        });

        Self {
            addr,
            state,
            handle,
        }
    }

    #[inline]
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// The client URL the server is reachable on.
    pub fn client_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn members(&self) -> Vec<FakeMember> {
        self.state.lock().members.clone()
    }

    /// Every request received so far as `METHOD path`.
    pub fn requests(&self) -> Vec<String> {
        self.state.lock().requests.clone()
    }

    /// Makes every following request fail with the given status.
    pub fn fail_with(&self, status: StatusCode) {
        self.state.lock().forced_status = Some(status);
    }
}

impl Drop for FakeEtcd {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn list_members(State(state): State<Shared>) -> Response {
    let mut state = state.lock();
    state.requests.push("GET /v2/members".to_string());
    if let Some(status) = state.forced_status {
        return (status, "forced failure").into_response();
    }

    Json(json!({ "members": state.members })).into_response()
}

#[derive(Debug, Deserialize)]
struct AddMemberRequest {
    #[serde(rename = "peerURLs")]
    peer_urls: Vec<String>,
}

async fn add_member(
    State(state): State<Shared>,
    Json(request): Json<AddMemberRequest>,
) -> Response {
    let mut state = state.lock();
    state.requests.push("POST /v2/members".to_string());
    if let Some(status) = state.forced_status {
        return (status, "forced failure").into_response();
    }

    let exists = state.members.iter().any(|member| {
        member
            .peer_urls
            .iter()
            .any(|url| request.peer_urls.contains(url))
    });
    if exists {
        return (StatusCode::CONFLICT, "etcdserver: peerURL exists").into_response();
    }

    state.next_id += 1;
    let member = FakeMember {
        id: format!("{:016x}", state.next_id),
        name: String::new(),
        peer_urls: request.peer_urls,
        client_urls: Vec::new(),
    };
    state.members.push(member.clone());

    (StatusCode::CREATED, Json(member)).into_response()
}

async fn remove_member(State(state): State<Shared>, Path(id): Path<String>) -> Response {
    let mut state = state.lock();
    state.requests.push(format!("DELETE /v2/members/{}", id));
    if let Some(status) = state.forced_status {
        return (status, "forced failure").into_response();
    }

    match state.members.iter().position(|member| member.id == id) {
        Some(position) => {
            state.members.remove(position);
            StatusCode::NO_CONTENT.into_response()
        },
        None => (StatusCode::NOT_FOUND, "etcdserver: member not found").into_response(),
    }
}
