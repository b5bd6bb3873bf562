// src/transport.rs
//! Line-oriented serial transport

use crate::{
    device::PortHandle,
    error::{GpsError, Result},
};
use async_trait::async_trait;
use std::{io, time::Duration};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_serial::{SerialPortBuilderExt, SerialStream};

/// An open, line-oriented communication channel
#[async_trait]
pub trait Channel: Send {
    /// Next line without its terminator; `Ok(None)` at end of stream
    async fn next_line(&mut self) -> io::Result<Option<String>>;

    /// Release the underlying port
    fn close(&mut self);
}

/// Opens channels on named ports
#[async_trait]
pub trait Transport: Send + Sync {
    async fn open(&self, port: &PortHandle, baud_rate: u32) -> Result<Box<dyn Channel>>;
}

/// Serial port transport backed by `tokio-serial`
#[derive(Debug, Clone, Copy, Default)]
pub struct SerialTransport;

#[async_trait]
impl Transport for SerialTransport {
    async fn open(&self, port: &PortHandle, baud_rate: u32) -> Result<Box<dyn Channel>> {
        let serial = tokio_serial::new(&port.name, baud_rate)
            .timeout(Duration::from_millis(1000))
            .open_native_async()
            .map_err(|e| GpsError::Connection(format!("Failed to open serial port {}: {}", port.name, e)))?;

        Ok(Box::new(SerialChannel {
            reader: Some(BufReader::new(serial)),
            buffer: Vec::with_capacity(128),
        }))
    }
}

/// Channel over an open serial stream
pub struct SerialChannel {
    reader: Option<BufReader<SerialStream>>,
    buffer: Vec<u8>,
}

#[async_trait]
impl Channel for SerialChannel {
    async fn next_line(&mut self) -> io::Result<Option<String>> {
        let reader = self
            .reader
            .as_mut()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotConnected, "port is closed"))?;

        self.buffer.clear();
        // Receivers emit noise while powering up, so decode lossily
        match reader.read_until(b'\n', &mut self.buffer).await? {
            0 => Ok(None),
            _ => Ok(Some(
                String::from_utf8_lossy(&self.buffer)
                    .trim_end_matches(['\r', '\n'])
                    .to_string(),
            )),
        }
    }

    fn close(&mut self) {
        // Dropping the stream closes the file descriptor / handle
        self.reader.take();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_opening_missing_port_fails() {
        let port = PortHandle::new("/dev/does-not-exist-gps", None);
        let result = SerialTransport.open(&port, 9600).await;
        assert!(matches!(result, Err(GpsError::Connection(_))));
    }
}
