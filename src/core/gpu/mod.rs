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

//! GPU state shared between the rendering thread and gateway callers
//!
//! This module holds everything command execution mutates: the embedded
//! framebuffer, the bounding box, pixel engine performance counters and the
//! register shadows written by `LOAD_*_REG` commands.
//!
//! # BP Registers With Side Effects
//!
//! ```text
//! Reg  | Name            | Effect
//! -----|-----------------|---------------------------------------------
//! 0x45 | PE_DONE         | Count a finished draw, raise PE finish
//! 0x47 | PE_TOKEN        | Store the token
//! 0x48 | PE_TOKEN_INT    | Store the token, raise PE token
//! 0x49 | EFB_TOP_LEFT    | Copy source x (bits 0-9), y (bits 10-19)
//! 0x4A | EFB_SIZE        | Copy source width-1, height-1 (same layout)
//! 0x4F | CLEAR_AR        | Clear alpha (bits 8-15), red (bits 0-7)
//! 0x50 | CLEAR_GB        | Clear green (bits 8-15), blue (bits 0-7)
//! 0x51 | CLEAR_Z         | Clear depth (24 bits)
//! 0x52 | EFB_COPY        | Copy; bit 11 also clears the source rectangle
//! 0x55 | BBOX_LEFTRIGHT  | Bounding box left (bits 0-9), right (bits 10-19)
//! 0x56 | BBOX_TOPBOTTOM  | Bounding box top (bits 0-9), bottom (bits 10-19)
//! 0x69 | PERF_RESET      | Zero the performance counters
//! ```
//!
//! Every other BP register is only shadowed.

pub mod efb;
pub mod opcodes;
pub mod perf;
#[cfg(test)]
mod tests;

pub use efb::{Efb, EfbAccessType, EfbRect, EFB_ACCESS_SENTINEL};
pub use opcodes::GxCommand;
pub use perf::{PerfCounters, PerfQueryType};

use crate::core::error::{Result, VideoError};
use crate::core::fifo::CommandFifo;
use crate::core::interrupt::{interrupts, InterruptController};

/// BP register numbers
pub mod bp {
    pub const PE_DONE: u8 = 0x45;
    pub const PE_TOKEN: u8 = 0x47;
    pub const PE_TOKEN_INT: u8 = 0x48;
    pub const EFB_TOP_LEFT: u8 = 0x49;
    pub const EFB_SIZE: u8 = 0x4A;
    pub const CLEAR_AR: u8 = 0x4F;
    pub const CLEAR_GB: u8 = 0x50;
    pub const CLEAR_Z: u8 = 0x51;
    pub const EFB_COPY: u8 = 0x52;
    pub const BBOX_LEFTRIGHT: u8 = 0x55;
    pub const BBOX_TOPBOTTOM: u8 = 0x56;
    pub const PERF_RESET: u8 = 0x69;

    /// EFB_COPY: clear the source rectangle after copying
    pub const COPY_CLEAR: u32 = 1 << 11;
}

/// Size of the XF register/memory space in words
pub const XF_SPACE_SIZE: usize = 0x1058;

/// Bounding box slot names, in `get_bounding_box` index order
pub const BBOX_LEFT: usize = 0;
pub const BBOX_RIGHT: usize = 1;
pub const BBOX_TOP: usize = 2;
pub const BBOX_BOTTOM: usize = 3;

/// Where a command's side effects go besides GPU state
pub struct ExecContext<'a> {
    pub fifo: &'a CommandFifo,
    pub interrupts: &'a InterruptController,
}

/// GPU-visible state mutated by command execution
pub struct GpuState {
    efb: Efb,

    /// left, right, top, bottom
    bounding_box: [u16; 4],

    perf: PerfCounters,

    bp_regs: [u32; 256],
    cp_regs: [u32; 256],
    xf_regs: Vec<u32>,

    clear_ar: u32,
    clear_gb: u32,
    clear_z: u32,

    copy_source: EfbRect,

    draw_done_count: u64,
    commands_executed: u64,
}

impl GpuState {
    /// Create state for an EFB of the given resolution
    pub fn new(efb_width: u32, efb_height: u32) -> Self {
        Self {
            efb: Efb::new(efb_width, efb_height),
            bounding_box: [0; 4],
            perf: PerfCounters::default(),
            bp_regs: [0; 256],
            cp_regs: [0; 256],
            xf_regs: vec![0; XF_SPACE_SIZE],
            clear_ar: 0,
            clear_gb: 0,
            clear_z: 0,
            copy_source: EfbRect::default(),
            draw_done_count: 0,
            commands_executed: 0,
        }
    }

    /// Zero everything, keeping the EFB resolution
    pub fn reset(&mut self) {
        self.efb.reset();
        self.bounding_box = [0; 4];
        self.perf.reset();
        self.bp_regs = [0; 256];
        self.cp_regs = [0; 256];
        self.xf_regs.fill(0);
        self.clear_ar = 0;
        self.clear_gb = 0;
        self.clear_z = 0;
        self.copy_source = EfbRect::default();
        self.draw_done_count = 0;
        self.commands_executed = 0;
    }

    // ---------------------------------------------------------------------
    // Gateway accessors

    /// CPU access to the EFB
    pub fn access_efb(&mut self, kind: EfbAccessType, x: u32, y: u32, data: u32) -> u32 {
        self.efb.access(kind, x, y, data)
    }

    /// Read a performance counter
    pub fn query_result(&self, query: PerfQueryType) -> u32 {
        self.perf.get(query)
    }

    /// Read one bounding box edge (0 left, 1 right, 2 top, 3 bottom)
    pub fn bounding_box(&self, index: usize) -> Result<u16> {
        self.bounding_box.get(index).copied().ok_or_else(|| {
            VideoError::InvalidArgument(format!("bounding box index {} out of range 0..=3", index))
        })
    }

    /// All four bounding box edges
    pub fn bounding_box_all(&self) -> [u16; 4] {
        self.bounding_box
    }

    /// Restore the bounding box from a savestate
    pub fn set_bounding_box(&mut self, bbox: [u16; 4]) {
        self.bounding_box = bbox;
    }

    pub fn efb(&self) -> &Efb {
        &self.efb
    }

    pub fn bp_reg(&self, register: u8) -> u32 {
        self.bp_regs[register as usize]
    }

    pub fn cp_reg(&self, register: u8) -> u32 {
        self.cp_regs[register as usize]
    }

    pub fn xf_reg(&self, address: u16) -> Option<u32> {
        self.xf_regs.get(address as usize).copied()
    }

    /// Current clear color as `0xAARRGGBB`
    pub fn clear_color(&self) -> u32 {
        let a = (self.clear_ar >> 8) & 0xFF;
        let r = self.clear_ar & 0xFF;
        let g = (self.clear_gb >> 8) & 0xFF;
        let b = self.clear_gb & 0xFF;
        (a << 24) | (r << 16) | (g << 8) | b
    }

    pub fn clear_z(&self) -> u32 {
        self.clear_z
    }

    pub fn copy_source(&self) -> EfbRect {
        self.copy_source
    }

    pub fn draw_done_count(&self) -> u64 {
        self.draw_done_count
    }

    pub fn commands_executed(&self) -> u64 {
        self.commands_executed
    }

    // ---------------------------------------------------------------------
    // Command execution

    /// Apply one decoded command
    pub fn execute(&mut self, command: &GxCommand, ctx: &ExecContext<'_>) {
        self.commands_executed += 1;
        match command {
            GxCommand::Nop => {}
            GxCommand::InvalidateVertexCache => {
                log::trace!("GX: invalidate vertex cache");
            }
            GxCommand::LoadCpReg { register, value } => {
                log::trace!("GX: CP[0x{:02X}] = 0x{:08X}", register, value);
                self.cp_regs[*register as usize] = *value;
            }
            GxCommand::LoadXfReg { address, values } => {
                log::trace!("GX: XF[0x{:04X}] <- {} words", address, values.len());
                for (i, v) in values.iter().enumerate() {
                    match self.xf_regs.get_mut(*address as usize + i) {
                        Some(slot) => *slot = *v,
                        None => {
                            log::warn!("GX: XF write past end at 0x{:04X}", *address as usize + i);
                            break;
                        }
                    }
                }
            }
            GxCommand::LoadBpReg { register, value } => self.write_bp(*register, *value, ctx),
            GxCommand::CallDisplayList { address, size } => {
                log::warn!(
                    "GX: CALL_DISPLAY_LIST 0x{:08X} ({} bytes) not supported, skipped",
                    address,
                    size
                );
            }
            GxCommand::Unknown(opcode) => {
                log::warn!("GX: unknown opcode 0x{:02X}, skipped", opcode);
            }
        }
    }

    fn write_bp(&mut self, register: u8, value: u32, ctx: &ExecContext<'_>) {
        log::trace!("GX: BP[0x{:02X}] = 0x{:06X}", register, value);
        self.bp_regs[register as usize] = value;

        match register {
            bp::PE_DONE => {
                self.draw_done_count += 1;
                ctx.interrupts.request(interrupts::PE_FINISH);
            }
            bp::PE_TOKEN => ctx.fifo.store_token(value as u16, false),
            bp::PE_TOKEN_INT => ctx.fifo.store_token(value as u16, true),
            bp::EFB_TOP_LEFT => {
                self.copy_source.x = value & 0x3FF;
                self.copy_source.y = (value >> 10) & 0x3FF;
            }
            bp::EFB_SIZE => {
                self.copy_source.width = (value & 0x3FF) + 1;
                self.copy_source.height = ((value >> 10) & 0x3FF) + 1;
            }
            bp::CLEAR_AR => self.clear_ar = value & 0xFFFF,
            bp::CLEAR_GB => self.clear_gb = value & 0xFFFF,
            bp::CLEAR_Z => self.clear_z = value & efb::DEPTH_MASK,
            bp::EFB_COPY => self.efb_copy(value),
            bp::BBOX_LEFTRIGHT => {
                self.bounding_box[BBOX_LEFT] = (value & 0x3FF) as u16;
                self.bounding_box[BBOX_RIGHT] = ((value >> 10) & 0x3FF) as u16;
            }
            bp::BBOX_TOPBOTTOM => {
                self.bounding_box[BBOX_TOP] = (value & 0x3FF) as u16;
                self.bounding_box[BBOX_BOTTOM] = ((value >> 10) & 0x3FF) as u16;
            }
            bp::PERF_RESET => self.perf.reset(),
            _ => {}
        }
    }

    fn efb_copy(&mut self, value: u32) {
        let source = self.copy_source;
        self.perf.add(PerfQueryType::EfbCopyClocks, source.area().max(1));

        if value & bp::COPY_CLEAR == 0 {
            return;
        }

        let color = self.clear_color();
        if let Some(cleared) = self.efb.clear_rect(source, color, self.clear_z) {
            self.perf.record_fill(cleared.area());
            self.extend_bounding_box(cleared);
            log::trace!("GX: EFB clear {:?} color=0x{:08X}", cleared, color);
        }
    }

    /// Grow the bounding box to cover `rect` (edges inclusive)
    fn extend_bounding_box(&mut self, rect: EfbRect) {
        let right = (rect.x + rect.width - 1).min(0x3FF) as u16;
        let bottom = (rect.y + rect.height - 1).min(0x3FF) as u16;
        let bbox = &mut self.bounding_box;
        bbox[BBOX_LEFT] = bbox[BBOX_LEFT].min(rect.x as u16);
        bbox[BBOX_RIGHT] = bbox[BBOX_RIGHT].max(right);
        bbox[BBOX_TOP] = bbox[BBOX_TOP].min(rect.y as u16);
        bbox[BBOX_BOTTOM] = bbox[BBOX_BOTTOM].max(bottom);
    }
}

impl Default for GpuState {
    fn default() -> Self {
        Self::new(Efb::DEFAULT_WIDTH, Efb::DEFAULT_HEIGHT)
    }
}
