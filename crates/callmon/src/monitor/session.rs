//! Reader thread owning the socket and the pending line buffer.

use std::io::{self, Read};
use std::net::{Shutdown, TcpStream};
use std::sync::Mutex;
use std::thread;

use tracing::{debug, info, trace, warn};

use super::{
    MONITOR_TARGET, MonitorError, SharedDispatcher, TransportEvent, TransportFault, lock, notify,
};
use crate::assembler::LineAssembler;
use crate::dispatch::Dispatcher;
use crate::event::PhoneEvent;
use crate::record;

const READ_CHUNK: usize = 4096;

/// A running connection: the reader thread plus a handle for shutting the
/// socket down from the owning side.
pub(super) struct Session {
    control: TcpStream,
    handle: thread::JoinHandle<()>,
}

impl Session {
    pub(super) fn start(
        mut stream: TcpStream,
        mut assembler: LineAssembler,
        phone: SharedDispatcher<PhoneEvent>,
        transport: SharedDispatcher<TransportEvent>,
    ) -> Result<Self, MonitorError> {
        let control = stream
            .try_clone()
            .map_err(|source| MonitorError::Socket { source })?;
        let handle = thread::Builder::new()
            .name(String::from("callmon-reader"))
            .spawn(move || read_loop(&mut stream, &mut assembler, &phone, &transport))
            .map_err(|source| MonitorError::Spawn { source })?;
        Ok(Self { control, handle })
    }

    pub(super) fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    pub(super) fn shutdown(&self) {
        if let Err(error) = self.control.shutdown(Shutdown::Both)
            && error.kind() != io::ErrorKind::NotConnected
        {
            debug!(
                target: MONITOR_TARGET,
                error = %error,
                "monitor socket shutdown failed"
            );
        }
    }

    pub(super) fn join(self) -> Result<(), MonitorError> {
        self.handle
            .join()
            .map_err(|_| MonitorError::ReaderPanicked)
    }
}

fn read_loop(
    stream: &mut TcpStream,
    assembler: &mut LineAssembler,
    phone: &Mutex<Dispatcher<PhoneEvent>>,
    transport: &Mutex<Dispatcher<TransportEvent>>,
) {
    let mut buffer = [0_u8; READ_CHUNK];
    let had_error = loop {
        match stream.read(&mut buffer) {
            Ok(0) => break false,
            Ok(read) => {
                let chunk = buffer.get(..read).unwrap_or_default();
                for line in assembler.feed(chunk) {
                    deliver(&line, phone);
                }
            }
            Err(error) if error.kind() == io::ErrorKind::Interrupted => {}
            Err(error) if is_timeout(&error) => notify(transport, &TransportEvent::Timeout),
            Err(error) => {
                warn!(
                    target: MONITOR_TARGET,
                    error = %error,
                    "monitor connection failed"
                );
                notify(transport, &TransportEvent::Error(TransportFault::from(&error)));
                break true;
            }
        }
    };

    // The device does not always terminate the last record before closing.
    if let Some(line) = assembler.finish() {
        deliver(&line, phone);
    }
    if !had_error {
        notify(transport, &TransportEvent::End);
    }
    notify(transport, &TransportEvent::Close { had_error });
    info!(target: MONITOR_TARGET, had_error, "monitor connection closed");
}

fn deliver(line: &str, phone: &Mutex<Dispatcher<PhoneEvent>>) {
    trace!(target: MONITOR_TARGET, line, "record received");
    let Some(event) = record::decode(line) else {
        return;
    };
    if let Err(error) = lock(phone).publish(&event) {
        debug!(
            target: MONITOR_TARGET,
            error = %error,
            "phone event delivered with handler failures"
        );
    }
}

fn is_timeout(error: &io::Error) -> bool {
    matches!(
        error.kind(),
        io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut
    )
}
