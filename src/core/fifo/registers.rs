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

//! Command processor register definitions
//!
//! This module contains the CP register map (offsets relative to the base
//! passed to `register_mmio`) and the bit layouts of the status, control and
//! clear registers.

use bitflags::bitflags;

/// CP register offsets
///
/// 32-bit quantities are split into a low half at the listed offset and a high
/// half at `offset + 2`.
pub mod offsets {
    /// Status register (R)
    pub const STATUS: u32 = 0x00;
    /// Control register (R/W)
    pub const CONTROL: u32 = 0x02;
    /// Clear register (W)
    pub const CLEAR: u32 = 0x04;
    /// Perf counter select (R/W)
    pub const PERF_SELECT: u32 = 0x06;
    /// PE token (R/W)
    pub const TOKEN: u32 = 0x0E;
    /// Bounding box left
    pub const BBOX_LEFT: u32 = 0x10;
    /// Bounding box right
    pub const BBOX_RIGHT: u32 = 0x12;
    /// Bounding box top
    pub const BBOX_TOP: u32 = 0x14;
    /// Bounding box bottom
    pub const BBOX_BOTTOM: u32 = 0x16;
    /// FIFO base (lo/hi)
    pub const FIFO_BASE: u32 = 0x20;
    /// FIFO end (lo/hi)
    pub const FIFO_END: u32 = 0x24;
    /// High watermark (lo/hi)
    pub const FIFO_HI_WATERMARK: u32 = 0x28;
    /// Low watermark (lo/hi)
    pub const FIFO_LO_WATERMARK: u32 = 0x2C;
    /// Read/write distance (lo/hi)
    pub const FIFO_RW_DISTANCE: u32 = 0x30;
    /// Write pointer (lo/hi)
    pub const FIFO_WRITE_POINTER: u32 = 0x34;
    /// Read pointer (lo/hi)
    pub const FIFO_READ_POINTER: u32 = 0x38;
    /// Breakpoint (lo/hi)
    pub const FIFO_BREAKPOINT: u32 = 0x3C;
}

/// Mask applied to the low half of FIFO addresses (32-byte granularity)
pub const ADDRESS_LO_MASK: u16 = 0xFFE0;

/// Mask applied to the high half of FIFO addresses (26-bit physical space)
pub const ADDRESS_HI_MASK: u16 = 0x03FF;

bitflags! {
    /// CP status register (read-only)
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct CpStatus: u16 {
        /// FIFO distance crossed above the high watermark
        const HI_WATERMARK = 1 << 0;
        /// FIFO distance crossed below the low watermark
        const LO_WATERMARK = 1 << 1;
        /// GP is not reading (disabled or nothing to read)
        const READ_IDLE = 1 << 2;
        /// No command in flight
        const COMMAND_IDLE = 1 << 3;
        /// Breakpoint reached
        const BREAKPOINT = 1 << 4;
    }
}

bitflags! {
    /// CP control register
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct CpControl: u16 {
        /// GP reads from the FIFO
        const READ_ENABLE = 1 << 0;
        /// Breakpoint armed
        const BP_ENABLE = 1 << 1;
        /// Interrupt on high watermark
        const HI_WATERMARK_INT = 1 << 2;
        /// Interrupt on low watermark
        const LO_WATERMARK_INT = 1 << 3;
        /// Gather pipe bursts feed the CP FIFO
        const LINK_ENABLE = 1 << 4;
        /// Interrupt on breakpoint
        const BP_INT = 1 << 5;
    }
}

bitflags! {
    /// CP clear register (write-only)
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct CpClear: u16 {
        /// Clear the latched high watermark condition
        const HI_WATERMARK = 1 << 0;
        /// Clear the latched low watermark condition
        const LO_WATERMARK = 1 << 1;
    }
}

bitflags! {
    /// Internal FIFO flag word
    ///
    /// Holds the guest-visible enables and latched conditions plus the level
    /// bits used for edge detection.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct FifoFlags: u32 {
        const LINK_ENABLE = 1 << 0;
        const READ_ENABLE = 1 << 1;
        const BP_ENABLE = 1 << 2;
        const BP_INT = 1 << 3;
        const BP_ACTIVE = 1 << 4;
        const HI_WATERMARK_INT = 1 << 5;
        const LO_WATERMARK_INT = 1 << 6;
        const HI_WATERMARK_ACTIVE = 1 << 7;
        const LO_WATERMARK_ACTIVE = 1 << 8;
        /// Distance currently above the high watermark
        const HI_OVER = 1 << 9;
        /// Distance currently below the low watermark
        const LO_UNDER = 1 << 10;
    }
}

impl FifoFlags {
    /// Guest-controlled enable bits
    pub const CONTROL_MASK: Self = Self::LINK_ENABLE
        .union(Self::READ_ENABLE)
        .union(Self::BP_ENABLE)
        .union(Self::BP_INT)
        .union(Self::HI_WATERMARK_INT)
        .union(Self::LO_WATERMARK_INT);

    /// Map a control register value onto flag bits
    pub fn from_control(control: CpControl) -> Self {
        let mut flags = Self::empty();
        flags.set(Self::READ_ENABLE, control.contains(CpControl::READ_ENABLE));
        flags.set(Self::BP_ENABLE, control.contains(CpControl::BP_ENABLE));
        flags.set(
            Self::HI_WATERMARK_INT,
            control.contains(CpControl::HI_WATERMARK_INT),
        );
        flags.set(
            Self::LO_WATERMARK_INT,
            control.contains(CpControl::LO_WATERMARK_INT),
        );
        flags.set(Self::LINK_ENABLE, control.contains(CpControl::LINK_ENABLE));
        flags.set(Self::BP_INT, control.contains(CpControl::BP_INT));
        flags
    }

    /// Rebuild the control register value
    pub fn to_control(self) -> CpControl {
        let mut control = CpControl::empty();
        control.set(CpControl::READ_ENABLE, self.contains(Self::READ_ENABLE));
        control.set(CpControl::BP_ENABLE, self.contains(Self::BP_ENABLE));
        control.set(
            CpControl::HI_WATERMARK_INT,
            self.contains(Self::HI_WATERMARK_INT),
        );
        control.set(
            CpControl::LO_WATERMARK_INT,
            self.contains(Self::LO_WATERMARK_INT),
        );
        control.set(CpControl::LINK_ENABLE, self.contains(Self::LINK_ENABLE));
        control.set(CpControl::BP_INT, self.contains(Self::BP_INT));
        control
    }

    /// Whether the CP interrupt line should be asserted
    pub fn interrupt_asserted(self) -> bool {
        (self.contains(Self::HI_WATERMARK_ACTIVE) && self.contains(Self::HI_WATERMARK_INT))
            || (self.contains(Self::LO_WATERMARK_ACTIVE) && self.contains(Self::LO_WATERMARK_INT))
            || (self.contains(Self::BP_ACTIVE) && self.contains(Self::BP_INT))
    }
}
