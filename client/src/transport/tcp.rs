use std::io::{ErrorKind, Read, Write};
use std::net::{Shutdown, TcpStream, ToSocketAddrs};

use log::debug;

use super::{Transport, TransportError};

const READ_CHUNK_SIZE: usize = 16 * 1024;

/// A [`Transport`] over a non-blocking TCP stream
pub struct TcpTransport {
    stream: Option<TcpStream>,
    read_chunk: Box<[u8; READ_CHUNK_SIZE]>,
}

impl TcpTransport {
    /// Connects (blocking) and switches the stream to non-blocking mode
    pub fn connect<A: ToSocketAddrs>(address: A) -> Result<Self, TransportError> {
        let stream = TcpStream::connect(address).map_err(io_error)?;
        stream.set_nonblocking(true).map_err(io_error)?;
        stream.set_nodelay(true).map_err(io_error)?;
        debug!("TcpTransport: connected to {:?}", stream.peer_addr().ok());
        Ok(Self {
            stream: Some(stream),
            read_chunk: Box::new([0u8; READ_CHUNK_SIZE]),
        })
    }

    fn stream_mut(&mut self) -> Result<&mut TcpStream, TransportError> {
        self.stream.as_mut().ok_or(TransportError::Closed)
    }
}

impl Transport for TcpTransport {
    fn send(&mut self, payload: &[u8]) -> Result<(), TransportError> {
        let stream = self.stream_mut()?;
        let mut written = 0;
        while written < payload.len() {
            match stream.write(&payload[written..]) {
                Ok(0) => return Err(TransportError::Closed),
                Ok(count) => written += count,
                // the socket buffer is full; a short spin keeps the
                // single-threaded model (sends are small and infrequent)
                Err(error) if error.kind() == ErrorKind::WouldBlock => continue,
                Err(error) if error.kind() == ErrorKind::Interrupted => continue,
                Err(error) => return Err(io_error(error)),
            }
        }
        Ok(())
    }

    fn receive(&mut self) -> Result<Option<Vec<u8>>, TransportError> {
        let chunk = &mut self.read_chunk[..];
        let stream = match self.stream.as_mut() {
            Some(stream) => stream,
            None => return Err(TransportError::Closed),
        };
        match stream.read(chunk) {
            Ok(0) => Err(TransportError::Closed),
            Ok(count) => Ok(Some(chunk[..count].to_vec())),
            Err(error) if error.kind() == ErrorKind::WouldBlock => Ok(None),
            Err(error) if error.kind() == ErrorKind::Interrupted => Ok(None),
            Err(error) => Err(io_error(error)),
        }
    }

    fn close(&mut self) {
        if let Some(stream) = self.stream.take() {
            let _ = stream.shutdown(Shutdown::Both);
        }
    }
}

fn io_error(error: std::io::Error) -> TransportError {
    TransportError::Io {
        detail: error.to_string(),
    }
}
