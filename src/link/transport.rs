//! Line transport to the remote monitor
//!
//! The link only needs to send a command line and read reply lines back.
//! Opening the device and configuring its baud rate happen before a
//! [`Transport`] is built.

use std::io::{BufRead, Write};

use super::LinkError;

/// A half-duplex, line-oriented byte stream.
pub trait Transport {
    /// Send one command. The line terminator is appended by the transport.
    fn send(&mut self, line: &str) -> Result<(), LinkError>;

    /// Read one reply line without its terminator.
    ///
    /// Returns `Ok(None)` when no line is available yet (the read timed out
    /// or the stream is at end of input).
    fn read_line(&mut self) -> Result<Option<String>, LinkError>;
}

/// [`Transport`] over any buffered reader and writer pair.
///
/// Typically both halves are clones of the same serial device handle.
pub struct IoTransport<R, W> {
    reader: R,
    writer: W,
}

impl<R: BufRead, W: Write> IoTransport<R, W> {
    pub fn new(reader: R, writer: W) -> Self {
        Self { reader, writer }
    }

    /// Give back the reader and writer halves.
    pub fn into_inner(self) -> (R, W) {
        (self.reader, self.writer)
    }
}

impl<R: BufRead, W: Write> Transport for IoTransport<R, W> {
    fn send(&mut self, line: &str) -> Result<(), LinkError> {
        self.writer.write_all(line.as_bytes())?;
        self.writer.write_all(b"\n")?;
        self.writer.flush()?;
        Ok(())
    }

    fn read_line(&mut self) -> Result<Option<String>, LinkError> {
        let mut line = String::new();
        match self.reader.read_line(&mut line) {
            Ok(0) => Ok(None),
            Ok(_) => Ok(Some(line.trim_end_matches(['\r', '\n']).to_string())),
            Err(e)
                if matches!(
                    e.kind(),
                    std::io::ErrorKind::TimedOut | std::io::ErrorKind::WouldBlock
                ) =>
            {
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }
}
