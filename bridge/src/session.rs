use crate::{transport::Transport, Error};
use std::{
    io,
    sync::{Mutex, MutexGuard, PoisonError, TryLockError},
    time::Duration,
};
use tracing::{debug, info, trace};

pub const DEFAULT_BAUD: u32 = 9600;
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(1);

/// A completed command/reply exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Exchange {
    pub sent: String,
    /// Empty if the robot did not answer in time.
    pub received: String,
}

/// The process-wide link to the robot.
///
/// Holds at most one transport and runs at most one transaction on it at a time.
pub struct Session {
    transport: Mutex<Option<Box<dyn Transport>>>,
    read_timeout: Duration,
}

impl Session {
    pub fn new(transport: impl Transport + 'static, read_timeout: Duration) -> Self {
        Self {
            transport: Mutex::new(Some(Box::new(transport))),
            read_timeout,
        }
    }

    /// A session without a device, every transaction fails with [`Error::DeviceUnavailable`].
    pub fn detached(read_timeout: Duration) -> Self {
        Self {
            transport: Mutex::new(None),
            read_timeout,
        }
    }

    pub fn is_open(&self) -> bool {
        match self.transport.try_lock() {
            Ok(transport) => transport.as_ref().is_some_and(|t| t.is_open()),
            // Held by an in-flight transaction
            Err(TryLockError::WouldBlock) => true,
            Err(TryLockError::Poisoned(e)) => e.into_inner().as_ref().is_some_and(|t| t.is_open()),
        }
    }

    /// Sends one command and waits for the reply line.
    ///
    /// Blocks for up to the read timeout, plus however long another transaction
    /// holds the link.
    pub fn transact(&self, command: &str) -> Result<Exchange, Error> {
        let command = command.trim();
        if command.is_empty() {
            return Err(Error::EmptyCommand);
        }

        let mut transport = self.lock();
        let transport = match transport.as_mut() {
            Some(transport) if transport.is_open() => transport,
            _ => return Err(Error::DeviceUnavailable),
        };

        let received = exchange(&mut **transport, command, self.read_timeout)?;
        info!("Sent {command:?}, received {received:?}");

        Ok(Exchange {
            sent: command.to_string(),
            received,
        })
    }

    fn lock(&self) -> MutexGuard<'_, Option<Box<dyn Transport>>> {
        self.transport
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

fn exchange(transport: &mut dyn Transport, command: &str, timeout: Duration) -> io::Result<String> {
    let discarded = transport.discard_input()?;
    debug!("Discarded {discarded} bytes prior to command");

    let mut frame = Vec::with_capacity(command.len() + 1);
    frame.extend_from_slice(command.as_bytes());
    frame.push(b'\n');

    trace!("Writing {frame:?}");
    transport.write_all(&frame)?;
    transport.flush()?;

    let reply = transport.read_line(timeout)?;
    trace!("Read {reply:?}");

    Ok(decode_reply(&reply))
}

/// Keeps the valid UTF-8 parts of `bytes` and strips trailing whitespace.
fn decode_reply(bytes: &[u8]) -> String {
    let text: String = bytes.utf8_chunks().map(|chunk| chunk.valid()).collect();
    text.trim_end().to_string()
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::transport::memory::{MemoryTransport, Operation};
    use std::{
        sync::{
            atomic::{AtomicUsize, Ordering},
            Arc,
        },
        thread,
    };

    fn echo_ok() -> MemoryTransport {
        MemoryTransport::new(|_: &str| Some("OK".to_string()))
    }

    #[test]
    fn basic_transaction() {
        let transport = MemoryTransport::new(|line: &str| Some(format!("Move {line}")));
        let session = Session::new(transport, DEFAULT_READ_TIMEOUT);

        assert_eq!(
            session.transact("X+"),
            Ok(Exchange {
                sent: "X+".to_string(),
                received: "Move X+".to_string(),
            })
        );
    }

    #[test]
    fn command_is_trimmed_before_sending() {
        let transport = echo_ok();
        let journal = transport.journal();
        let session = Session::new(transport, DEFAULT_READ_TIMEOUT);

        let exchange = session.transact("  HALT \r\n").unwrap();
        assert_eq!(exchange.sent, "HALT");
        assert!(journal
            .operations()
            .contains(&Operation::Write(b"HALT\n".to_vec())));
    }

    #[test]
    fn empty_command_does_no_io() {
        let transport = echo_ok();
        let journal = transport.journal();
        let session = Session::new(transport, DEFAULT_READ_TIMEOUT);

        assert_eq!(session.transact(""), Err(Error::EmptyCommand));
        assert_eq!(session.transact(" \t\n"), Err(Error::EmptyCommand));
        assert!(journal.operations().is_empty());
    }

    #[test]
    fn detached_session_is_unavailable() {
        let session = Session::detached(DEFAULT_READ_TIMEOUT);

        assert!(!session.is_open());
        assert_eq!(session.transact("HALT"), Err(Error::DeviceUnavailable));
    }

    #[test]
    fn closed_transport_is_unavailable_without_io() {
        let transport = echo_ok().closed();
        let journal = transport.journal();
        let session = Session::new(transport, DEFAULT_READ_TIMEOUT);

        assert!(!session.is_open());
        assert_eq!(session.transact("HALT"), Err(Error::DeviceUnavailable));
        assert!(journal.operations().is_empty());
    }

    #[test]
    fn empty_command_wins_over_missing_device() {
        let session = Session::detached(DEFAULT_READ_TIMEOUT);
        assert_eq!(session.transact("   "), Err(Error::EmptyCommand));
    }

    #[test]
    fn input_is_discarded_once_before_each_write() {
        let transport = echo_ok();
        let journal = transport.journal();
        let session = Session::new(transport, DEFAULT_READ_TIMEOUT);

        session.transact("X+").unwrap();
        session.transact("RELEASED").unwrap();

        assert_eq!(
            journal.operations(),
            vec![
                Operation::DiscardInput,
                Operation::Write(b"X+\n".to_vec()),
                Operation::Flush,
                Operation::ReadLine,
                Operation::DiscardInput,
                Operation::Write(b"RELEASED\n".to_vec()),
                Operation::Flush,
                Operation::ReadLine,
            ]
        );
    }

    #[test]
    fn stale_reply_is_not_attributed_to_next_command() {
        let transport = MemoryTransport::new(|_: &str| Some("Halt Robot".to_string()))
            .with_pending_input(b"Move X+\r\n");
        let session = Session::new(transport, DEFAULT_READ_TIMEOUT);

        assert_eq!(session.transact("HALT").unwrap().received, "Halt Robot");
    }

    #[test]
    fn no_reply_is_not_an_error() {
        let transport = MemoryTransport::new(|_: &str| -> Option<String> { None });
        let session = Session::new(transport, DEFAULT_READ_TIMEOUT);

        assert_eq!(
            session.transact("RELEASED"),
            Ok(Exchange {
                sent: "RELEASED".to_string(),
                received: String::new(),
            })
        );
    }

    #[test]
    fn io_failure_carries_message() {
        let transport = echo_ok().with_fault("device disconnected");
        let session = Session::new(transport, DEFAULT_READ_TIMEOUT);

        assert_eq!(
            session.transact("HALT"),
            Err(Error::IoFailure("device disconnected".to_string()))
        );
        assert_eq!(
            session.transact("HALT").unwrap_err().to_string(),
            "device disconnected"
        );
    }

    #[test]
    fn read_failure_after_write_carries_message() {
        let transport = echo_ok().with_read_fault("device disconnected");
        let journal = transport.journal();
        let session = Session::new(transport, DEFAULT_READ_TIMEOUT);

        assert_eq!(
            session.transact("PULL 5"),
            Err(Error::IoFailure("device disconnected".to_string()))
        );
        assert_eq!(
            journal.operations(),
            vec![
                Operation::DiscardInput,
                Operation::Write(b"PULL 5\n".to_vec()),
                Operation::Flush,
                Operation::ReadLine,
            ]
        );
    }

    #[test]
    fn concurrent_transactions_are_serialized() {
        let in_flight = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let device = {
            let in_flight = in_flight.clone();
            let peak = peak.clone();
            move |line: &str| {
                let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                thread::sleep(Duration::from_millis(5));
                in_flight.fetch_sub(1, Ordering::SeqCst);
                Some(format!("echo {line}"))
            }
        };
        let session = Arc::new(Session::new(
            MemoryTransport::new(device),
            DEFAULT_READ_TIMEOUT,
        ));

        let workers: Vec<_> = (0..8)
            .map(|worker| {
                let session = session.clone();
                thread::spawn(move || {
                    for i in 0..5 {
                        let command = format!("PULL {}", worker * 10 + i);
                        let exchange = session.transact(&command).unwrap();
                        assert_eq!(exchange.sent, command);
                        assert_eq!(exchange.received, format!("echo {command}"));
                    }
                })
            })
            .collect();

        for worker in workers {
            worker.join().unwrap();
        }

        assert_eq!(peak.load(Ordering::SeqCst), 1);
        assert_eq!(in_flight.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn invalid_utf8_is_dropped() {
        assert_eq!(decode_reply(b"Pu\xffll 1.0 ml\r\n"), "Pull 1.0 ml");
        assert_eq!(decode_reply(b"\xc3\r\n"), "");
        assert_eq!(decode_reply(b"  OK \n"), "  OK");
    }

    #[test]
    fn error_messages() {
        assert_eq!(Error::EmptyCommand.to_string(), "No command provided.");
        assert_eq!(Error::DeviceUnavailable.to_string(), "Serial port is not open.");
    }
}
