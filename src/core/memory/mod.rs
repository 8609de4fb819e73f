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

//! Guest memory shared between the CPU thread and the rendering thread
//!
//! The command FIFO is a ring buffer living in main RAM: the gather pipe
//! writes bursts into it from the CPU thread and the command processor reads
//! them back on the rendering thread. This module provides that shared RAM
//! plus the narrow MMIO registration contract used for the command processor
//! registers.
//!
//! # Memory Map
//!
//! | Virtual Address Range  | Region                 |
//! |------------------------|------------------------|
//! | 0x00000000-0x017FFFFF  | MEM1, physical         |
//! | 0x80000000-0x817FFFFF  | MEM1, cached mirror    |
//! | 0xC0000000-0xC17FFFFF  | MEM1, uncached mirror  |
//!
//! # Example
//!
//! ```
//! use gxvideo::core::memory::{GuestMemory, MainRam};
//!
//! let ram = MainRam::new(0x10000);
//! ram.write(0x8000_0100, &[0x61, 0x47, 0x00, 0x12, 0x34]).unwrap();
//!
//! let mut buf = [0u8; 5];
//! ram.read(0x0000_0100, &mut buf).unwrap();
//! assert_eq!(buf, [0x61, 0x47, 0x00, 0x12, 0x34]);
//! ```

mod mmio;
#[cfg(test)]
mod tests;

pub use mmio::{Mapping, ReadHandler, WriteHandler};

use crate::core::error::{Result, VideoError};
use crate::core::lock_unpoisoned;
use std::sync::{Mutex, RwLock};

/// Byte-addressed guest memory
///
/// Implementations must be safe to read from the rendering thread while the
/// CPU thread writes other addresses.
pub trait GuestMemory: Send + Sync {
    /// Copy `buf.len()` bytes starting at `addr` into `buf`
    fn read(&self, addr: u32, buf: &mut [u8]) -> Result<()>;

    /// Copy `data` into guest memory starting at `addr`
    fn write(&self, addr: u32, data: &[u8]) -> Result<()>;

    /// Size of the backing store in bytes
    fn size(&self) -> usize;
}

/// Main RAM (MEM1)
pub struct MainRam {
    data: RwLock<Vec<u8>>,
}

impl MainRam {
    /// Size of retail MEM1 (24MB)
    pub const MEM1_SIZE: usize = 24 * 1024 * 1024;

    /// Create zero-filled RAM of `size` bytes
    pub fn new(size: usize) -> Self {
        Self {
            data: RwLock::new(vec![0; size]),
        }
    }

    /// Translate a virtual address to a physical one
    ///
    /// The cached (0x8...) and uncached (0xC...) segments both mirror physical
    /// memory, so only the low 30 bits are kept.
    #[inline(always)]
    pub fn translate_address(vaddr: u32) -> u32 {
        vaddr & 0x3FFF_FFFF
    }

    fn range(&self, addr: u32, len: usize, size: usize) -> Result<std::ops::Range<usize>> {
        let start = Self::translate_address(addr) as usize;
        match start.checked_add(len) {
            Some(end) if end <= size => Ok(start..end),
            _ => Err(VideoError::InvalidMemoryAccess { address: addr, len }),
        }
    }
}

impl Default for MainRam {
    fn default() -> Self {
        Self::new(Self::MEM1_SIZE)
    }
}

impl GuestMemory for MainRam {
    fn read(&self, addr: u32, buf: &mut [u8]) -> Result<()> {
        let data = self.data.read().unwrap_or_else(|e| e.into_inner());
        let range = self.range(addr, buf.len(), data.len())?;
        buf.copy_from_slice(&data[range]);
        Ok(())
    }

    fn write(&self, addr: u32, bytes: &[u8]) -> Result<()> {
        let mut data = self.data.write().unwrap_or_else(|e| e.into_inner());
        let len = data.len();
        let range = self.range(addr, bytes.len(), len)?;
        data[range].copy_from_slice(bytes);
        Ok(())
    }

    fn size(&self) -> usize {
        self.data.read().unwrap_or_else(|e| e.into_inner()).len()
    }
}

/// Guest memory wrapper that records the address and length of every write
pub struct TracingMemory<M: GuestMemory> {
    inner: M,
    writes: Mutex<Vec<(u32, usize)>>,
}

impl<M: GuestMemory> TracingMemory<M> {
    /// Wrap `inner`
    pub fn new(inner: M) -> Self {
        Self {
            inner,
            writes: Mutex::new(Vec::new()),
        }
    }

    /// Address and length of every write so far
    pub fn writes(&self) -> Vec<(u32, usize)> {
        lock_unpoisoned(&self.writes).clone()
    }
}

impl<M: GuestMemory> GuestMemory for TracingMemory<M> {
    fn read(&self, addr: u32, buf: &mut [u8]) -> Result<()> {
        self.inner.read(addr, buf)
    }

    fn write(&self, addr: u32, data: &[u8]) -> Result<()> {
        lock_unpoisoned(&self.writes).push((addr, data.len()));
        self.inner.write(addr, data)
    }

    fn size(&self) -> usize {
        self.inner.size()
    }
}
