use std::{io, time::Duration};

/// A line-oriented byte stream to the robot.
pub trait Transport: Send {
    /// Whether the link can currently carry a transaction.
    fn is_open(&self) -> bool;

    /// Drops any bytes already received, returning how many were dropped.
    fn discard_input(&mut self) -> io::Result<usize>;

    fn write_all(&mut self, data: &[u8]) -> io::Result<()>;

    fn flush(&mut self) -> io::Result<()>;

    /// Reads up to and including the next `\n`.
    ///
    /// If `timeout` expires first the bytes received so far are returned,
    /// which may be none at all.
    fn read_line(&mut self, timeout: Duration) -> io::Result<Vec<u8>>;
}

pub mod memory;
pub mod serialport;
