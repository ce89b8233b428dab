//! Chrome native messaging framing: a little-endian `u32` length followed by
//! UTF-8 JSON.

use std::io::ErrorKind;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::errors::FrameError;

/// Largest message the browser may send to a native host.
pub const MAX_INBOUND_FRAME_BYTES: usize = 64 * 1024 * 1024;
/// Largest message a native host may send to the browser.
pub const MAX_OUTBOUND_FRAME_BYTES: usize = 1024 * 1024;

/// Reads one frame. `Ok(None)` is a clean end of stream between frames.
pub async fn read_frame<R>(reader: &mut R) -> Result<Option<Vec<u8>>, FrameError>
where
    R: AsyncRead + Unpin,
{
    let mut header = [0_u8; 4];
    match reader.read_exact(&mut header).await {
        Ok(_) => {}
        Err(err) if err.kind() == ErrorKind::UnexpectedEof => return Ok(None),
        Err(err) => return Err(err.into()),
    }

    let frame_len = u32::from_le_bytes(header) as usize;
    if frame_len > MAX_INBOUND_FRAME_BYTES {
        return Err(FrameError::TooLarge {
            frame_bytes: frame_len,
            max_bytes: MAX_INBOUND_FRAME_BYTES,
        });
    }

    let mut payload = vec![0_u8; frame_len];
    match reader.read_exact(&mut payload).await {
        Ok(_) => Ok(Some(payload)),
        Err(err) if err.kind() == ErrorKind::UnexpectedEof => {
            Err(FrameError::Truncated { expected: frame_len })
        }
        Err(err) => Err(err.into()),
    }
}

pub async fn write_frame<W>(writer: &mut W, payload: &[u8]) -> Result<(), FrameError>
where
    W: AsyncWrite + Unpin,
{
    if payload.len() > MAX_OUTBOUND_FRAME_BYTES {
        return Err(FrameError::TooLarge {
            frame_bytes: payload.len(),
            max_bytes: MAX_OUTBOUND_FRAME_BYTES,
        });
    }
    let len = u32::try_from(payload.len()).map_err(|_| FrameError::TooLarge {
        frame_bytes: payload.len(),
        max_bytes: MAX_OUTBOUND_FRAME_BYTES,
    })?;
    writer.write_all(&len.to_le_bytes()).await?;
    writer.write_all(payload).await?;
    writer.flush().await?;
    Ok(())
}

/// A JSON error leaves the stream aligned on the next frame.
pub async fn read_message<R, T>(reader: &mut R) -> Result<Option<T>, FrameError>
where
    R: AsyncRead + Unpin,
    T: DeserializeOwned,
{
    match read_frame(reader).await? {
        Some(payload) => Ok(Some(serde_json::from_slice(&payload)?)),
        None => Ok(None),
    }
}

pub async fn write_message<W, T>(writer: &mut W, message: &T) -> Result<(), FrameError>
where
    W: AsyncWrite + Unpin,
    T: Serialize,
{
    let payload = serde_json::to_vec(message)?;
    write_frame(writer, &payload).await
}
