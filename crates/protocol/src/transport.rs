//! Length-framed JSON transport between supervisor and audit worker.

use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tracing::warn;

/// Upper bound on a single frame body. Anything larger is treated as corrupt.
pub const MAX_FRAME_BYTES: usize = 16 * 1024 * 1024;

/// Transport errors.
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("Transport closed")]
    Closed,

    #[error("Frame too large: {0} bytes")]
    Oversize(usize),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Writing half of the transport.
pub struct FrameSender<W> {
    writer: W,
}

impl<W: AsyncWrite + Unpin> FrameSender<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    /// Serialize `payload` and write it as one frame.
    ///
    /// # Errors
    /// Serialization failures are returned to the caller and leave the
    /// transport usable; IO failures indicate the stream is gone.
    pub async fn send<T: Serialize>(&mut self, payload: &T) -> Result<(), TransportError> {
        let body = serde_json::to_vec(payload)?;
        if body.len() > MAX_FRAME_BYTES {
            return Err(TransportError::Oversize(body.len()));
        }

        let mut frame = Vec::with_capacity(4 + body.len());
        frame.extend_from_slice(&(body.len() as u32).to_be_bytes());
        frame.extend_from_slice(&body);

        // Single write keeps the frame atomic on the stream.
        self.writer.write_all(&frame).await?;
        self.writer.flush().await?;
        Ok(())
    }
}

/// Reading half of the transport.
pub struct FrameReceiver<R> {
    reader: R,
}

impl<R: AsyncRead + Unpin> FrameReceiver<R> {
    pub fn new(reader: R) -> Self {
        Self { reader }
    }

    /// Read one frame and decode it.
    ///
    /// # Returns
    /// `Ok(Some(value))` for a decoded frame; `Ok(None)` when a corrupt frame
    /// was discarded (the stream stays readable); `Err(TransportError::Closed)`
    /// once the peer hangs up.
    pub async fn recv<T: DeserializeOwned>(&mut self) -> Result<Option<T>, TransportError> {
        let mut len_buf = [0u8; 4];
        self.read_exact(&mut len_buf).await?;
        let len = u32::from_be_bytes(len_buf) as usize;

        if len == 0 || len > MAX_FRAME_BYTES {
            warn!("Frame length out of bounds: {}", len);
            return Err(TransportError::Oversize(len));
        }

        let mut body = vec![0u8; len];
        self.read_exact(&mut body).await?;

        match serde_json::from_slice(&body) {
            Ok(value) => Ok(Some(value)),
            Err(e) => {
                warn!("Discarding corrupt frame: {}", e);
                Ok(None)
            }
        }
    }

    async fn read_exact(&mut self, buf: &mut [u8]) -> Result<(), TransportError> {
        self.reader.read_exact(buf).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::UnexpectedEof {
                TransportError::Closed
            } else {
                TransportError::Io(e)
            }
        })?;
        Ok(())
    }
}
