//! CapturePort - screen capture.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::PortError;

/// An opaque captured frame.
///
/// Pixels are shared, so cloning a frame (e.g. to keep it as "last frame") is cheap.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pub id: u64,
    pub captured_at: DateTime<Utc>,
    pub width: u32,
    pub height: u32,
    pub pixels: Arc<[u8]>,
}

impl Frame {
    pub fn new(id: u64, captured_at: DateTime<Utc>, width: u32, height: u32, pixels: Arc<[u8]>) -> Self {
        Self {
            id,
            captured_at,
            width,
            height,
            pixels,
        }
    }

    /// A frame with no pixel data, for ports that carry state out of band.
    pub fn empty(id: u64, captured_at: DateTime<Utc>) -> Self {
        Self::new(id, captured_at, 0, 0, Arc::from(Vec::new()))
    }

    pub fn info(&self) -> FrameInfo {
        FrameInfo {
            id: self.id,
            captured_at: self.captured_at,
            width: self.width,
            height: self.height,
        }
    }
}

/// Frame metadata exposed through the status snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameInfo {
    pub id: u64,
    pub captured_at: DateTime<Utc>,
    pub width: u32,
    pub height: u32,
}

#[async_trait]
pub trait CapturePort: Send + Sync {
    async fn capture(&self) -> Result<Frame, PortError>;
}
