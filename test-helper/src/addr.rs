use std::net::{SocketAddr, TcpListener};

/// Gets a new socket address allocated by the OS.
///
/// Nothing listens on the address once this returns, which makes it useful
/// both for binding test servers and as an endpoint that refuses connections.
pub fn get_unused_addr() -> SocketAddr {
    let socket = TcpListener::bind("127.0.0.1:0").unwrap();
    socket.local_addr().unwrap()
}
