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

//! CPU-side gather pipe
//!
//! The CPU writes GX commands to a write-gather port rather than straight to
//! memory. Writes accumulate in a 32-byte buffer; each time it fills, the
//! whole burst is stored at the processor interface's write pointer (wrapping
//! inside the FIFO ring) and the backend is told about it.
//!
//! Values are stored big-endian, as the console CPU would write them.
//!
//! # Example
//!
//! ```
//! use gxvideo::core::backend::{NullDevice, VideoBackend, VideoContext, WindowHandle};
//! use gxvideo::core::config::VideoConfig;
//! use gxvideo::core::gather_pipe::GatherPipe;
//! use gxvideo::core::interrupt::InterruptController;
//! use gxvideo::core::memory::MainRam;
//! use std::sync::Arc;
//!
//! let context = VideoContext::new(
//!     Arc::new(MainRam::new(0x10000)),
//!     Arc::new(InterruptController::new()),
//!     VideoConfig::default(),
//! );
//! let backend = Arc::new(VideoBackend::new(Box::new(NullDevice), &context));
//! backend.initialize(WindowHandle::HEADLESS).unwrap();
//! backend.fifo().init_ring(0x1000, 0x2000);
//!
//! let mut pipe = GatherPipe::new(Arc::clone(&backend));
//! pipe.write_bytes(&[0u8; 40]).unwrap();
//! assert_eq!(pipe.pending(), 8);
//! assert_eq!(backend.fifo().cpu_write_pointer(), 0x1020);
//! ```

use crate::core::backend::VideoBackend;
use crate::core::error::Result;
use crate::core::gpu::GxCommand;
use std::sync::Arc;

/// Burst size in bytes
pub const BURST_SIZE: usize = 32;

/// Write-combining buffer feeding the command FIFO
pub struct GatherPipe {
    backend: Arc<VideoBackend>,
    buffer: Vec<u8>,
    bursts: u64,
}

impl GatherPipe {
    pub fn new(backend: Arc<VideoBackend>) -> Self {
        Self {
            backend,
            buffer: Vec::with_capacity(BURST_SIZE * 2),
            bursts: 0,
        }
    }

    #[inline]
    pub fn write_u8(&mut self, value: u8) -> Result<()> {
        self.write_bytes(&[value])
    }

    #[inline]
    pub fn write_u16(&mut self, value: u16) -> Result<()> {
        self.write_bytes(&value.to_be_bytes())
    }

    #[inline]
    pub fn write_u32(&mut self, value: u32) -> Result<()> {
        self.write_bytes(&value.to_be_bytes())
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        self.buffer.extend_from_slice(bytes);
        self.check_gather_pipe()
    }

    /// Encode and write a whole command
    pub fn write_command(&mut self, command: &GxCommand) -> Result<()> {
        let mut bytes = Vec::with_capacity(16);
        command.encode_into(&mut bytes);
        self.write_bytes(&bytes)
    }

    /// Pad the buffer with NOPs up to the next burst boundary and send it
    pub fn pad_and_flush(&mut self) -> Result<()> {
        let partial = self.buffer.len() % BURST_SIZE;
        if partial != 0 {
            self.buffer.resize(self.buffer.len() + BURST_SIZE - partial, 0);
        }
        self.check_gather_pipe()
    }

    /// Bytes waiting for a full burst
    pub fn pending(&self) -> usize {
        self.buffer.len()
    }

    /// Bursts sent so far
    pub fn bursts(&self) -> u64 {
        self.bursts
    }

    fn check_gather_pipe(&mut self) -> Result<()> {
        while self.buffer.len() >= BURST_SIZE {
            let mut burst = [0u8; BURST_SIZE];
            burst.copy_from_slice(&self.buffer[..BURST_SIZE]);
            self.buffer.drain(..BURST_SIZE);

            let fifo = self.backend.fifo();
            let address = fifo.advance_cpu_write_pointer(BURST_SIZE as u32);
            fifo.write_ring(self.backend.memory().as_ref(), address, &burst)?;
            self.bursts += 1;
            self.backend.gather_pipe_bursted();
        }
        Ok(())
    }
}
