//! Fake call-monitor device for CLI tests.
//!
//! Accepts a single connection, streams a canned capture in small chunks and
//! closes the socket, the way the device does when it is restarted.

use std::io::Write;
use std::net::TcpListener;
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};

pub(in crate::tests) struct FakeDevice {
    port: u16,
    handle: Option<thread::JoinHandle<Result<()>>>,
}

impl FakeDevice {
    /// Spawns a device listening on an ephemeral port.
    pub fn spawn(payload: Vec<u8>, chunk_size: usize) -> Result<Self> {
        let listener = TcpListener::bind(("127.0.0.1", 0)).context("bind fake device")?;
        let port = listener.local_addr().context("local addr")?.port();
        let handle = thread::spawn(move || {
            let (mut stream, _) = listener.accept().context("accept client")?;
            for chunk in payload.chunks(chunk_size.max(1)) {
                stream.write_all(chunk).context("write chunk")?;
                stream.flush().context("flush chunk")?;
                thread::sleep(Duration::from_millis(1));
            }
            Ok(())
        });
        Ok(Self {
            port,
            handle: Some(handle),
        })
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Waits for the device thread and surfaces its outcome.
    pub fn finish(&mut self) -> Result<()> {
        let Some(handle) = self.handle.take() else {
            return Ok(());
        };
        handle
            .join()
            .map_err(|_| anyhow!("fake device thread panicked"))?
            .context("fake device failed")
    }
}

/// Returns a local port with nothing listening on it.
pub(in crate::tests) fn unused_port() -> Result<u16> {
    let listener = TcpListener::bind(("127.0.0.1", 0)).context("bind probe")?;
    Ok(listener.local_addr().context("probe addr")?.port())
}
