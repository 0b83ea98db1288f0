//! In-memory implementations of the bootstrap capabilities.
//!
//! These record every call made against them so tests can assert on the
//! exact sequence of membership mutations.

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use thiserror::Error;

use crate::{Instance, InstanceDirectory, Member, MembershipClient, Registrar};

#[derive(Debug, Error)]
#[error("{0}")]
/// A failure injected into one of the in-memory capabilities.
pub struct InjectedError(pub String);

#[derive(Debug, Clone)]
/// A fixed instance directory.
pub struct MemoryDirectory {
    instances: Vec<Instance>,
    local: Instance,
    fail_listing: bool,
}

impl MemoryDirectory {
    pub fn new(instances: Vec<Instance>, local: Instance) -> Self {
        Self {
            instances,
            local,
            fail_listing: false,
        }
    }

    /// Makes every `list_instances` call fail.
    pub fn failing(mut self) -> Self {
        self.fail_listing = true;
        self
    }
}

#[async_trait]
impl InstanceDirectory for MemoryDirectory {
    type Error = InjectedError;

    async fn list_instances(&self) -> Result<Vec<Instance>, Self::Error> {
        if self.fail_listing {
            return Err(InjectedError("instance listing failed".to_string()));
        }
        Ok(self.instances.clone())
    }

    async fn local_instance(&self) -> Result<Instance, Self::Error> {
        Ok(self.local.clone())
    }
}

#[derive(Debug, Clone, Eq, PartialEq)]
/// A call made against [MemoryMembership].
pub enum MembershipCall {
    List,
    Add(String),
    Remove(Member),
}

#[derive(Debug, Default)]
struct MembershipState {
    members: Vec<Member>,
    calls: Vec<MembershipCall>,
    fail_listing: bool,
    fail_additions: bool,
    fail_removals: bool,
}

#[derive(Debug, Clone, Default)]
/// An etcd member list held in memory.
///
/// Added peer URLs show up as half-joined members, the same way etcd
/// reports them until the owning node starts.
pub struct MemoryMembership(Arc<Mutex<MembershipState>>);

impl MemoryMembership {
    pub fn with_members(members: Vec<Member>) -> Self {
        let state = MembershipState {
            members,
            ..Default::default()
        };
        Self(Arc::new(Mutex::new(state)))
    }

    /// The current member list, without recording a call.
    pub fn members(&self) -> Vec<Member> {
        self.0.lock().members.clone()
    }

    /// Every call made so far, in order.
    pub fn calls(&self) -> Vec<MembershipCall> {
        self.0.lock().calls.clone()
    }

    /// Every add and remove call made so far, in order.
    pub fn mutations(&self) -> Vec<MembershipCall> {
        self.calls()
            .into_iter()
            .filter(|call| !matches!(call, MembershipCall::List))
            .collect()
    }

    pub fn fail_listing(&self, fail: bool) {
        self.0.lock().fail_listing = fail;
    }

    pub fn fail_additions(&self, fail: bool) {
        self.0.lock().fail_additions = fail;
    }

    pub fn fail_removals(&self, fail: bool) {
        self.0.lock().fail_removals = fail;
    }
}

#[async_trait]
impl MembershipClient for MemoryMembership {
    type Error = InjectedError;

    async fn list_members(&self) -> Result<Vec<Member>, Self::Error> {
        let mut state = self.0.lock();
        state.calls.push(MembershipCall::List);
        if state.fail_listing {
            return Err(InjectedError("certificate signed by unknown authority".to_string()));
        }
        Ok(state.members.clone())
    }

    async fn add_member(&self, peer_url: &str) -> Result<(), Self::Error> {
        let mut state = self.0.lock();
        state.calls.push(MembershipCall::Add(peer_url.to_string()));
        if state.fail_additions {
            return Err(InjectedError("etcdserver: unhealthy cluster".to_string()));
        }
        state.members.push(Member::half_joined(peer_url));
        Ok(())
    }

    async fn remove_member(&self, member: &Member) -> Result<(), Self::Error> {
        let mut state = self.0.lock();
        state.calls.push(MembershipCall::Remove(member.clone()));
        if state.fail_removals {
            return Err(InjectedError("etcdserver: request timed out".to_string()));
        }

        let position = state.members.iter().position(|existing| match member.name() {
            Some(name) => existing.name() == Some(name),
            None => existing.is_half_joined() && existing.peer_url == member.peer_url,
        });
        if let Some(position) = position {
            state.members.remove(position);
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default)]
/// A registrar which remembers every published instance set.
pub struct MemoryRegistrar(Arc<Mutex<Vec<Vec<Instance>>>>);

impl MemoryRegistrar {
    pub fn published(&self) -> Vec<Vec<Instance>> {
        self.0.lock().clone()
    }
}

#[async_trait]
impl Registrar for MemoryRegistrar {
    type Error = InjectedError;

    async fn publish(&self, instances: &[Instance]) -> Result<(), Self::Error> {
        self.0.lock().push(instances.to_vec());
        Ok(())
    }
}
