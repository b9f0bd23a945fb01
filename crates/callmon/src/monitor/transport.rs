//! TCP connection establishment for the monitor port.

use std::io;
use std::net::{SocketAddr, TcpStream, ToSocketAddrs};
use std::time::Duration;

use callmon_config::MonitorEndpoint;
use tracing::debug;

use super::{MONITOR_TARGET, MonitorError};

/// Connects to `endpoint`, trying each resolved address in turn.
pub(super) fn connect(
    endpoint: &MonitorEndpoint,
    timeout: Duration,
) -> Result<TcpStream, MonitorError> {
    let addresses = resolve(endpoint)?;
    let mut last_error = None;
    for address in addresses {
        match TcpStream::connect_timeout(&address, timeout) {
            Ok(stream) => return Ok(stream),
            Err(error) => {
                debug!(
                    target: MONITOR_TARGET,
                    address = %address,
                    error = %error,
                    "monitor address unreachable"
                );
                last_error = Some(error);
            }
        }
    }

    Err(match last_error {
        Some(source) => MonitorError::Connect {
            endpoint: endpoint.to_string(),
            source,
        },
        None => MonitorError::ResolveEmpty {
            endpoint: endpoint.to_string(),
        },
    })
}

fn resolve(endpoint: &MonitorEndpoint) -> Result<Vec<SocketAddr>, MonitorError> {
    resolve_tcp_addresses(endpoint.host(), endpoint.port()).map_err(|source| {
        MonitorError::Resolve {
            endpoint: endpoint.to_string(),
            source,
        }
    })
}

fn resolve_tcp_addresses(host: &str, port: u16) -> io::Result<Vec<SocketAddr>> {
    Ok((host, port).to_socket_addrs()?.collect())
}
