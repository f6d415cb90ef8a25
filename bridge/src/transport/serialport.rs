use serialport::{ClearBuffer, DataBits, FlowControl, Parity, SerialPort, StopBits};
use std::{
    io,
    time::{Duration, Instant},
};
use tracing::trace;

pub struct SerialTransport {
    port: Box<dyn SerialPort>,
}

impl SerialTransport {
    /// Opens `path` as 8N1 with no flow control.
    pub fn new(path: &str, baud: u32, timeout: Duration) -> Result<Self, serialport::Error> {
        let port = serialport::new(path, baud)
            .data_bits(DataBits::Eight)
            .parity(Parity::None)
            .stop_bits(StopBits::One)
            .flow_control(FlowControl::None)
            .timeout(timeout)
            .open()?;

        Ok(Self { port })
    }
}

impl super::Transport for SerialTransport {
    fn is_open(&self) -> bool {
        // Fails once the device has gone away, e.g. the USB cable was pulled
        self.port.bytes_to_read().is_ok()
    }

    fn discard_input(&mut self) -> io::Result<usize> {
        let pending = self.port.bytes_to_read()?;
        self.port.clear(ClearBuffer::Input)?;
        Ok(pending as usize)
    }

    fn write_all(&mut self, data: &[u8]) -> io::Result<()> {
        io::Write::write_all(&mut *self.port, data)
    }

    fn flush(&mut self) -> io::Result<()> {
        io::Write::flush(&mut *self.port)
    }

    fn read_line(&mut self, timeout: Duration) -> io::Result<Vec<u8>> {
        let deadline = Instant::now() + timeout;
        let mut line = Vec::new();
        let mut byte = [0u8; 1];

        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                trace!("Read deadline passed with {} bytes received", line.len());
                break;
            }
            self.port.set_timeout(remaining)?;

            match io::Read::read(&mut *self.port, &mut byte) {
                Ok(0) => break,
                Ok(_) => {
                    line.push(byte[0]);
                    if byte[0] == b'\n' {
                        break;
                    }
                }
                Err(e) if e.kind() == io::ErrorKind::TimedOut => {
                    trace!("Read timed out with {} bytes received", line.len());
                    break;
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => return Err(e),
            }
        }

        Ok(line)
    }
}
