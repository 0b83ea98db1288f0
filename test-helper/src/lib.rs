mod addr;
mod etcd;
mod tls;

pub use addr::get_unused_addr;
pub use etcd::{FakeEtcd, FakeMember};
pub use tls::{cert_path, TlsEtcd};

pub use axum::http::StatusCode;
