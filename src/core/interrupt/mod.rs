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

//! Processor Interface interrupt lines used by the video core
//!
//! The command processor and pixel engine signal the CPU through the processor
//! interface's interrupt cause register. The video core only drives three of
//! its sources, but the controller keeps the full 32-bit cause/mask layout so
//! it can be wired into a larger interrupt model.
//!
//! ## Registers
//!
//! - **INTSR** (cause): one bit per pending source
//! - **INTMR** (mask): 1 = source may reach the CPU
//!
//! ## Sources driven here
//!
//! ```text
//! Bit  | Source        | Description
//! -----|---------------|----------------------------------
//! 9    | PE_TOKEN      | Pixel engine token reached (interrupt variant)
//! 10   | PE_FINISH     | Pixel engine draw done
//! 11   | CP            | Command processor FIFO condition
//! ```
//!
//! Unlike a single-threaded device, this controller is shared between the
//! emulated CPU thread and the rendering thread, so every register is an
//! atomic and all methods take `&self`.

use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};

/// Interrupt source bit flags
pub mod interrupts {
    /// Pixel engine token interrupt (bit 9)
    pub const PE_TOKEN: u32 = 1 << 9;

    /// Pixel engine finish (draw done) interrupt (bit 10)
    pub const PE_FINISH: u32 = 1 << 10;

    /// Command processor FIFO interrupt (bit 11)
    pub const CP: u32 = 1 << 11;
}

/// Thread-safe interrupt cause/mask controller
///
/// # Example
///
/// ```
/// use gxvideo::core::interrupt::{InterruptController, interrupts};
///
/// let ic = InterruptController::new();
/// ic.write_mask(interrupts::CP);
/// ic.set_line(interrupts::CP, true);
/// assert!(ic.is_pending());
///
/// ic.set_line(interrupts::CP, false);
/// assert!(!ic.is_pending());
/// ```
#[derive(Debug, Default)]
pub struct InterruptController {
    /// Pending sources
    cause: AtomicU32,

    /// Enabled sources
    mask: AtomicU32,

    /// Number of rising edges seen on any source
    raises: AtomicU64,
}

impl InterruptController {
    /// Create a new controller with every source cleared and masked
    pub fn new() -> Self {
        Self::default()
    }

    /// Assert one or more sources
    pub fn request(&self, source: u32) {
        let previous = self.cause.fetch_or(source, Ordering::AcqRel);
        if previous & source != source {
            self.raises.fetch_add(1, Ordering::Relaxed);
        }
        log::trace!(
            "IRQ requested: 0x{:08X}, cause=0x{:08X}",
            source,
            previous | source
        );
    }

    /// Deassert one or more sources
    pub fn acknowledge(&self, source: u32) {
        let previous = self.cause.fetch_and(!source, Ordering::AcqRel);
        log::trace!("IRQ acknowledged, cause=0x{:08X}", previous & !source);
    }

    /// Drive a level-sensitive line
    pub fn set_line(&self, source: u32, asserted: bool) {
        if asserted {
            self.request(source);
        } else {
            self.acknowledge(source);
        }
    }

    /// Check whether any unmasked source is pending
    pub fn is_pending(&self) -> bool {
        self.read_cause() & self.read_mask() != 0
    }

    /// Check a single source regardless of the mask
    pub fn is_asserted(&self, source: u32) -> bool {
        self.read_cause() & source != 0
    }

    /// Read the cause register
    pub fn read_cause(&self) -> u32 {
        self.cause.load(Ordering::Acquire)
    }

    /// Read the mask register
    pub fn read_mask(&self) -> u32 {
        self.mask.load(Ordering::Acquire)
    }

    /// Write the mask register
    pub fn write_mask(&self, value: u32) {
        self.mask.store(value, Ordering::Release);
        log::trace!("IRQ mask set to 0x{:08X}", value);
    }

    /// Total number of rising edges observed since construction
    pub fn raise_count(&self) -> u64 {
        self.raises.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests;
