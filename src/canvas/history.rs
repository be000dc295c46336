//! Undo history
//!
//! Each snapshot is the full canvas serialized with bincode and LZ4
//! compressed. Drawings are mostly background, so snapshots stay small.

use thiserror::Error;

use super::raster::Canvas;

/// Default number of retained snapshots
pub const DEFAULT_HISTORY_DEPTH: usize = 20;

#[derive(Debug, Error)]
pub enum HistoryError {
    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Compression error: {0}")]
    Compression(String),
}

impl From<bincode::Error> for HistoryError {
    fn from(err: bincode::Error) -> Self {
        HistoryError::Serialization(err.to_string())
    }
}

pub type HistoryResult<T> = Result<T, HistoryError>;

/// Compress a canvas into a snapshot
pub fn compress_snapshot(canvas: &Canvas) -> HistoryResult<Vec<u8>> {
    let serialized = bincode::serialize(canvas)?;
    Ok(lz4_flex::compress_prepend_size(&serialized))
}

/// Restore a canvas from a snapshot
pub fn decompress_snapshot(data: &[u8]) -> HistoryResult<Canvas> {
    let decompressed = lz4_flex::decompress_size_prepended(data)
        .map_err(|e| HistoryError::Compression(format!("LZ4 decompression failed: {}", e)))?;
    Ok(bincode::deserialize(&decompressed)?)
}

/// Bounded linear undo stack
#[derive(Debug, Clone)]
pub struct History {
    depth: usize,
    snapshots: Vec<Vec<u8>>,
    /// Index of the snapshot matching the visible canvas
    step: usize,
}

impl History {
    pub fn new(depth: usize) -> Self {
        Self {
            depth: depth.max(1),
            snapshots: Vec::new(),
            step: 0,
        }
    }

    /// Record the current canvas. Anything ahead of the current step (left
    /// over from an undo) is discarded first.
    pub fn push(&mut self, canvas: &Canvas) -> HistoryResult<()> {
        let snapshot = compress_snapshot(canvas)?;

        if !self.snapshots.is_empty() {
            self.snapshots.truncate(self.step + 1);
        }
        self.snapshots.push(snapshot);

        if self.snapshots.len() > self.depth {
            let excess = self.snapshots.len() - self.depth;
            self.snapshots.drain(..excess);
        }
        self.step = self.snapshots.len() - 1;

        tracing::debug!(step = self.step, size = self.snapshots.len(), "Snapshot recorded");
        Ok(())
    }

    /// Step back one snapshot. `None` means there is nothing earlier and
    /// the caller should clear the canvas.
    pub fn undo(&mut self) -> HistoryResult<Option<Canvas>> {
        if self.step == 0 {
            return Ok(None);
        }
        self.step -= 1;
        decompress_snapshot(&self.snapshots[self.step]).map(Some)
    }

    /// Re-apply a snapshot discarded by `undo`
    pub fn redo(&mut self) -> HistoryResult<Option<Canvas>> {
        if self.step + 1 >= self.snapshots.len() {
            return Ok(None);
        }
        self.step += 1;
        decompress_snapshot(&self.snapshots[self.step]).map(Some)
    }

    pub fn can_undo(&self) -> bool {
        self.step > 0
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Total bytes held by compressed snapshots
    pub fn compressed_bytes(&self) -> usize {
        self.snapshots.iter().map(Vec::len).sum()
    }

    pub fn clear(&mut self) {
        self.snapshots.clear();
        self.step = 0;
    }
}

impl Default for History {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_DEPTH)
    }
}
