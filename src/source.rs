//! Source trait for inbound hub bytes

use crate::Result;

/// Anything that yields raw transport reads from a hub.
///
/// Chunk boundaries carry no meaning: a chunk may hold part of a frame,
/// several frames, or noise between frames. Sources handle their own
/// timing; the driver simply awaits the next chunk.
#[async_trait::async_trait]
pub trait ChunkSource: Send + 'static {
    /// Get the next chunk of bytes
    ///
    /// Returns:
    /// - `Ok(Some(bytes))` - more data
    /// - `Ok(None)` - the transport closed (normal termination)
    /// - `Err(e)` - a read failed; the driver retries with backoff
    async fn next_chunk(&mut self) -> Result<Option<Vec<u8>>>;

    /// Human-readable name for logs.
    fn describe(&self) -> String {
        std::any::type_name::<Self>().to_string()
    }
}
