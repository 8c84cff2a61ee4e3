//! Audio file loading and chunking for the streaming demo.

use std::path::Path;

use anyhow::Context;
use bytes::Bytes;

/// Read a raw audio file fully into memory.
pub async fn load(path: &Path) -> anyhow::Result<Bytes> {
    let data = tokio::fs::read(path)
        .await
        .with_context(|| format!("failed to read audio file {}", path.display()))?;
    Ok(Bytes::from(data))
}

/// Split `audio` into frames of `size` bytes; the last frame may be shorter.
///
/// Frames share the underlying buffer.
pub fn chunks(audio: Bytes, size: usize) -> impl Iterator<Item = Bytes> {
    let size = size.max(1);
    (0..audio.len())
        .step_by(size)
        .map(move |start| audio.slice(start..(start + size).min(audio.len())))
}
