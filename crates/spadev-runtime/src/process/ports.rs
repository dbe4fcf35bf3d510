//! Port allocation utilities for process management.

use spadev_core::{DevServerError, DevServerResult};
use std::net::{Ipv4Addr, TcpListener};
use tracing::debug;

/// Ask the OS for a currently unused loopback port.
///
/// Binds a listener on port 0, reads back the assigned port and drops the
/// listener, which releases the port. Nothing reserves it afterwards: another
/// process may take it before the dev server binds.
pub fn find_available_port() -> DevServerResult<u16> {
    let listener = TcpListener::bind((Ipv4Addr::LOCALHOST, 0))
        .map_err(|e| DevServerError::PortAllocation(e.to_string()))?;
    let port = listener
        .local_addr()
        .map_err(|e| DevServerError::PortAllocation(e.to_string()))?
        .port();
    drop(listener);

    debug!(port = %port, "Allocated available port");
    Ok(port)
}

/// Check if a port is available by attempting to bind to it.
pub fn is_port_available(port: u16) -> bool {
    TcpListener::bind((Ipv4Addr::LOCALHOST, port)).is_ok()
}
