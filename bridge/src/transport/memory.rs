//! An in-memory link to a [`Device`] living in the same process.
//!
//! Used to run the bridge without hardware and as a test double. Every call
//! made on the transport is recorded in a [`Journal`].

use std::{
    collections::VecDeque,
    io,
    sync::{Arc, Mutex, PoisonError},
    time::Duration,
};
use tracing::trace;

/// Something that answers command lines the way the robot does.
pub trait Device: Send {
    /// Called with each complete line written, without its terminator.
    fn respond(&mut self, line: &str) -> Option<String>;
}

impl<F> Device for F
where
    F: FnMut(&str) -> Option<String> + Send,
{
    fn respond(&mut self, line: &str) -> Option<String> {
        self(line)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    DiscardInput,
    Write(Vec<u8>),
    Flush,
    ReadLine,
}

/// Shared record of the operations performed on a [`MemoryTransport`].
#[derive(Debug, Clone, Default)]
pub struct Journal(Arc<Mutex<Vec<Operation>>>);

impl Journal {
    pub fn operations(&self) -> Vec<Operation> {
        self.0
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn record(&self, operation: Operation) {
        self.0
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(operation);
    }
}

pub struct MemoryTransport {
    device: Box<dyn Device>,
    open: bool,
    fault: Option<String>,
    read_fault: Option<String>,
    rx: VecDeque<u8>,
    tx: Vec<u8>,
    journal: Journal,
}

impl MemoryTransport {
    pub fn new(device: impl Device + 'static) -> Self {
        Self {
            device: Box::new(device),
            open: true,
            fault: None,
            read_fault: None,
            rx: VecDeque::new(),
            tx: Vec::new(),
            journal: Journal::default(),
        }
    }

    /// Makes the transport report itself as not open.
    pub fn closed(mut self) -> Self {
        self.open = false;
        self
    }

    /// Bytes that are already waiting to be read before the first transaction.
    pub fn with_pending_input(mut self, data: &[u8]) -> Self {
        self.rx.extend(data);
        self
    }

    /// Makes every I/O operation fail with `message`.
    pub fn with_fault(mut self, message: impl Into<String>) -> Self {
        self.fault = Some(message.into());
        self
    }

    /// Makes only `read_line` fail with `message`, after the command has gone out.
    pub fn with_read_fault(mut self, message: impl Into<String>) -> Self {
        self.read_fault = Some(message.into());
        self
    }

    pub fn journal(&self) -> Journal {
        self.journal.clone()
    }

    fn check_fault(&self) -> io::Result<()> {
        fail_with(self.fault.as_deref())
    }

    fn deliver_complete_lines(&mut self) {
        while let Some(end) = self.tx.iter().position(|b| *b == b'\n') {
            let frame: Vec<u8> = self.tx.drain(..=end).collect();
            let line = String::from_utf8_lossy(&frame);
            let line = line.trim_end_matches(['\r', '\n']);

            trace!("Device received {line:?}");
            if let Some(reply) = self.device.respond(line) {
                trace!("Device replied {reply:?}");
                self.rx.extend(reply.as_bytes());
                self.rx.extend(b"\r\n");
            }
        }
    }
}

impl super::Transport for MemoryTransport {
    fn is_open(&self) -> bool {
        self.open
    }

    fn discard_input(&mut self) -> io::Result<usize> {
        self.journal.record(Operation::DiscardInput);
        self.check_fault()?;

        let count = self.rx.len();
        self.rx.clear();
        Ok(count)
    }

    fn write_all(&mut self, data: &[u8]) -> io::Result<()> {
        self.journal.record(Operation::Write(data.to_vec()));
        self.check_fault()?;

        self.tx.extend_from_slice(data);
        self.deliver_complete_lines();
        Ok(())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.journal.record(Operation::Flush);
        self.check_fault()
    }

    fn read_line(&mut self, _timeout: Duration) -> io::Result<Vec<u8>> {
        self.journal.record(Operation::ReadLine);
        self.check_fault()?;
        fail_with(self.read_fault.as_deref())?;

        // Running out of bytes stands in for the timeout expiring
        let end = self
            .rx
            .iter()
            .position(|b| *b == b'\n')
            .map_or(self.rx.len(), |i| i + 1);
        Ok(self.rx.drain(..end).collect())
    }
}

fn fail_with(fault: Option<&str>) -> io::Result<()> {
    match fault {
        Some(message) => Err(io::Error::new(io::ErrorKind::BrokenPipe, message)),
        None => Ok(()),
    }
}
