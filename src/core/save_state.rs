// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 itsakeyfut
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Video savestate serialization
//!
//! A savestate captures everything the video core needs to resume exactly where
//! it stopped: the CP FIFO registers (in a fixed field order), the field
//! bookkeeping and the bounding box.
//!
//! # Format
//!
//! States are serialized with bincode's standard configuration. Each state
//! carries a version number; loading a state with a different version fails
//! with [`VideoError::SaveState`].
//!
//! # Example
//!
//! ```no_run
//! use gxvideo::core::save_state::VideoState;
//!
//! let state = VideoState::default();
//! state.save_to_file("video.state").unwrap();
//!
//! let loaded = VideoState::load_from_file("video.state").unwrap();
//! assert_eq!(loaded.fifo, state.fifo);
//! ```

use super::backend::field::FieldSnapshot;
use super::error::{Result, VideoError};
use bincode::{config, Decode, Encode};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

/// Savestate version for compatibility checking
pub const VIDEO_STATE_VERSION: u32 = 1;

/// Complete video core savestate
#[derive(Debug, Clone, Serialize, Deserialize, Encode, Decode)]
pub struct VideoState {
    /// Version number for compatibility checking
    pub version: u32,

    /// When and by which backend the state was taken
    pub metadata: VideoStateMetadata,

    /// CP FIFO registers
    pub fifo: FifoState,

    /// Field bookkeeping
    pub field: FieldSnapshot,

    /// Bounding box (left, right, top, bottom)
    pub bounding_box: [u16; 4],
}

/// Savestate metadata
#[derive(Debug, Clone, Serialize, Deserialize, Encode, Decode)]
#[bincode(encode_bounds = "", decode_bounds = "")]
pub struct VideoStateMetadata {
    /// Timestamp when the state was created
    #[bincode(with_serde)]
    pub timestamp: DateTime<Utc>,

    /// Name of the backend that produced the state
    pub backend: String,
}

/// CP FIFO registers
///
/// Field order is part of the savestate format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, Encode, Decode)]
pub struct FifoState {
    pub base: u32,
    pub end: u32,
    pub hi_watermark: u32,
    pub lo_watermark: u32,
    /// Informational; the distance is re-derived from the pointers on load
    pub read_write_distance: u32,
    pub write_pointer: u32,
    pub read_pointer: u32,
    pub breakpoint: u32,
    pub safe_read_pointer: u32,
    pub token: u16,
    pub token_pending: bool,
    pub cpu_write_pointer: u32,
    pub flags: u32,
}

impl VideoState {
    /// Build a state stamped with the current time
    pub fn new(
        backend: impl Into<String>,
        fifo: FifoState,
        field: FieldSnapshot,
        bounding_box: [u16; 4],
    ) -> Self {
        Self {
            version: VIDEO_STATE_VERSION,
            metadata: VideoStateMetadata {
                timestamp: Utc::now(),
                backend: backend.into(),
            },
            fifo,
            field,
            bounding_box,
        }
    }

    /// Serialize to bytes
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        bincode::encode_to_vec(self, config::standard())
            .map_err(|e| VideoError::SaveState(e.to_string()))
    }

    /// Deserialize from bytes, checking the version
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let (state, _): (VideoState, usize) =
            bincode::decode_from_slice(bytes, config::standard())
                .map_err(|e| VideoError::SaveState(e.to_string()))?;

        if state.version != VIDEO_STATE_VERSION {
            return Err(VideoError::SaveState(format!(
                "Incompatible save state version: expected {}, got {}",
                VIDEO_STATE_VERSION, state.version
            )));
        }

        Ok(state)
    }

    /// Save state to file
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be created or written, or if
    /// serialization fails.
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let encoded = self.to_bytes()?;
        let mut file = File::create(path)?;
        file.write_all(&encoded)?;
        Ok(())
    }

    /// Load state from file
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be read, deserialization fails or the
    /// version is incompatible.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut file = File::open(path)?;
        let mut buffer = Vec::new();
        file.read_to_end(&mut buffer)?;
        Self::from_bytes(&buffer)
    }
}

impl Default for VideoState {
    fn default() -> Self {
        Self::new(
            String::new(),
            FifoState::default(),
            FieldSnapshot::default(),
            [0; 4],
        )
    }
}
