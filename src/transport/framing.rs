//! Request framing
//!
//! A frame is complete once the buffered bytes hold one whole JSON value, once
//! they can no longer become valid JSON, or when the peer closes its write half.

use serde::de::IgnoredAny;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt};

const READ_CHUNK_BYTES: usize = 1024;

#[derive(Debug, Error)]
pub enum FrameError {
    #[error("request too large: {size} bytes exceeds {max_size} byte limit")]
    RequestTooLarge { size: usize, max_size: usize },
    #[error("timed out waiting for request")]
    TimedOut,
    #[error("failed to read request: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FrameStatus {
    Incomplete,
    Complete { end: usize },
    Malformed,
}

/// Reads one request frame.
///
/// Returns `Ok(None)` when the peer disconnects without sending anything.
pub async fn read_request<R>(
    reader: &mut R,
    max_size: usize,
) -> Result<Option<Vec<u8>>, FrameError>
where
    R: AsyncRead + Unpin,
{
    let mut buffer = Vec::new();
    let mut chunk = [0_u8; READ_CHUNK_BYTES];

    loop {
        let bytes_read = reader.read(&mut chunk).await?;
        if bytes_read == 0 {
            return Ok((!buffer.is_empty()).then_some(buffer));
        }

        buffer.extend_from_slice(&chunk[..bytes_read]);
        match frame_status(&buffer) {
            FrameStatus::Complete { end } if end > max_size => {
                return Err(FrameError::RequestTooLarge {
                    size: end,
                    max_size,
                })
            }
            FrameStatus::Complete { .. } | FrameStatus::Malformed => return Ok(Some(buffer)),
            FrameStatus::Incomplete if buffer.len() > max_size => {
                return Err(FrameError::RequestTooLarge {
                    size: buffer.len(),
                    max_size,
                })
            }
            FrameStatus::Incomplete => {}
        }
    }
}

/// Classifies the buffer. `end` is the offset just past the first complete value.
fn frame_status(buffer: &[u8]) -> FrameStatus {
    let mut values = serde_json::Deserializer::from_slice(buffer).into_iter::<IgnoredAny>();
    match values.next() {
        Some(Ok(_)) => FrameStatus::Complete {
            end: values.byte_offset(),
        },
        Some(Err(err)) if err.is_eof() => FrameStatus::Incomplete,
        Some(Err(_)) => FrameStatus::Malformed,
        None => FrameStatus::Incomplete,
    }
}
