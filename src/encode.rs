use std::path::{Path, PathBuf};

use crate::core::{FrameIndex, FrameRgba};
use crate::error::{ReelError, ReelResult};

pub mod ffmpeg;

/// Configuration handed to a sink before any frames arrive.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SinkConfig {
    /// Output width in pixels.
    pub width: u32,
    /// Output height in pixels.
    pub height: u32,
    /// Output frames per second.
    pub fps: u32,
}

/// Sink contract for consuming rendered frames in timeline order.
///
/// Ordering contract: `push_frame` is called in strictly increasing
/// `FrameIndex` order. Implementations reject violations instead of
/// producing a silently reordered output.
pub trait FrameSink: Send {
    /// Called once before any frames are pushed.
    fn begin(&mut self, cfg: SinkConfig) -> ReelResult<()>;
    /// Push one frame in strictly increasing timeline order.
    fn push_frame(&mut self, idx: FrameIndex, frame: &FrameRgba) -> ReelResult<()>;
    /// Called once after the last frame is pushed.
    fn end(&mut self) -> ReelResult<()>;
}

/// In-memory sink for tests and debugging.
#[derive(Debug, Default)]
pub struct InMemorySink {
    cfg: Option<SinkConfig>,
    last_idx: Option<FrameIndex>,
    frames: Vec<(FrameIndex, FrameRgba)>,
}

impl InMemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// The configuration captured in `begin`, if any.
    pub fn config(&self) -> Option<SinkConfig> {
        self.cfg
    }

    /// The captured frames, in the order they were pushed.
    pub fn frames(&self) -> &[(FrameIndex, FrameRgba)] {
        &self.frames
    }
}

impl FrameSink for InMemorySink {
    fn begin(&mut self, cfg: SinkConfig) -> ReelResult<()> {
        self.cfg = Some(cfg);
        self.last_idx = None;
        self.frames.clear();
        Ok(())
    }

    fn push_frame(&mut self, idx: FrameIndex, frame: &FrameRgba) -> ReelResult<()> {
        if self.cfg.is_none() {
            return Err(ReelError::encode("sink not started"));
        }
        if let Some(last) = self.last_idx
            && idx.0 <= last.0
        {
            return Err(ReelError::encode("sink received out-of-order frame index"));
        }
        self.last_idx = Some(idx);
        self.frames.push((idx, frame.clone()));
        Ok(())
    }

    fn end(&mut self) -> ReelResult<()> {
        Ok(())
    }
}

/// Resolve the caller's export target to a concrete file path.
///
/// An existing directory gets a timestamped `race-{unix_seconds}.mp4` inside
/// it, so repeated interactive exports never collide; anything else is taken
/// verbatim.
pub fn resolve_output_path(target: impl AsRef<Path>) -> PathBuf {
    let target = target.as_ref();
    if target.is_dir() {
        let seconds = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        target.join(format!("race-{seconds}.mp4"))
    } else {
        target.to_path_buf()
    }
}
