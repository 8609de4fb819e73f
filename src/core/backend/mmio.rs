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

//! CP register MMIO handlers
//!
//! 32-bit FIFO registers are exposed as two 16-bit halves: the low half at the
//! register offset, the high half at `offset + 2`. Address halves are masked
//! on write (low to 32-byte alignment, high to the physical address space).
//! Writes wait while another thread holds the pause lock.

use super::VideoBackend;
use crate::core::fifo::registers::{
    offsets, CpClear, CpControl, ADDRESS_HI_MASK, ADDRESS_LO_MASK,
};
use crate::core::fifo::CommandFifo;
use crate::core::gpu::{BBOX_BOTTOM, BBOX_LEFT, BBOX_RIGHT, BBOX_TOP};
use crate::core::lock_unpoisoned;
use crate::core::memory::Mapping;
use std::sync::Arc;

type Getter = fn(&CommandFifo) -> u32;
type Setter = fn(&CommandFifo, u32);

impl VideoBackend {
    /// Register the CP register block at `base`
    pub fn register_mmio(self: &Arc<Self>, mapping: &mut Mapping, base: u32) {
        let this = Arc::clone(self);
        mapping.register(
            base + offsets::STATUS,
            Box::new(move |_| this.fifo.status().bits()),
            Mapping::invalid_write(),
        );

        let (r, w) = (Arc::clone(self), Arc::clone(self));
        mapping.register(
            base + offsets::CONTROL,
            Box::new(move |_| r.fifo.control().bits()),
            Box::new(move |_, value| {
                {
                    let _gate = w.fifo.gate().enter();
                    w.fifo.store_control(CpControl::from_bits_truncate(value));
                }
                w.fifo_registers_changed();
            }),
        );

        let this = Arc::clone(self);
        mapping.register(
            base + offsets::CLEAR,
            Mapping::invalid_read(),
            Box::new(move |_, value| this.fifo.clear(CpClear::from_bits_truncate(value))),
        );

        let (r, w) = (Arc::clone(self), Arc::clone(self));
        mapping.register(
            base + offsets::PERF_SELECT,
            Box::new(move |_| r.perf_select()),
            Box::new(move |_, value| w.set_perf_select(value)),
        );

        let (r, w) = (Arc::clone(self), Arc::clone(self));
        mapping.register(
            base + offsets::TOKEN,
            Box::new(move |_| r.fifo.token()),
            Box::new(move |_, value| w.fifo.set_token(value, false)),
        );

        for (offset, index) in [
            (offsets::BBOX_LEFT, BBOX_LEFT),
            (offsets::BBOX_RIGHT, BBOX_RIGHT),
            (offsets::BBOX_TOP, BBOX_TOP),
            (offsets::BBOX_BOTTOM, BBOX_BOTTOM),
        ] {
            let this = Arc::clone(self);
            mapping.register(
                base + offset,
                Box::new(move |_| lock_unpoisoned(&this.gpu).bounding_box_all()[index]),
                Mapping::invalid_write(),
            );
        }

        let pairs: [(u32, Getter, Setter); 8] = [
            (offsets::FIFO_BASE, CommandFifo::base, CommandFifo::store_base),
            (offsets::FIFO_END, CommandFifo::end, CommandFifo::store_end),
            (
                offsets::FIFO_HI_WATERMARK,
                CommandFifo::hi_watermark,
                CommandFifo::store_hi_watermark,
            ),
            (
                offsets::FIFO_LO_WATERMARK,
                CommandFifo::lo_watermark,
                CommandFifo::store_lo_watermark,
            ),
            (
                offsets::FIFO_RW_DISTANCE,
                CommandFifo::read_write_distance,
                CommandFifo::store_read_write_distance,
            ),
            (
                offsets::FIFO_WRITE_POINTER,
                CommandFifo::write_pointer,
                CommandFifo::store_write_pointer,
            ),
            (
                offsets::FIFO_READ_POINTER,
                CommandFifo::read_pointer,
                CommandFifo::store_read_pointer,
            ),
            (
                offsets::FIFO_BREAKPOINT,
                CommandFifo::breakpoint,
                CommandFifo::store_breakpoint,
            ),
        ];
        for (offset, get, set) in pairs {
            self.register_pair(mapping, base + offset, get, set);
        }

        log::debug!(
            "Registered CP MMIO block at 0x{:08X} ({} handlers)",
            base,
            mapping.len()
        );
    }

    fn register_pair(
        self: &Arc<Self>,
        mapping: &mut Mapping,
        address: u32,
        get: Getter,
        set: Setter,
    ) {
        let (r, w) = (Arc::clone(self), Arc::clone(self));
        mapping.register(
            address,
            Box::new(move |_| get(&r.fifo) as u16),
            Box::new(move |_, value| {
                {
                    let _gate = w.fifo.gate().enter();
                    let old = get(&w.fifo);
                    set(&w.fifo, (old & 0xFFFF_0000) | u32::from(value & ADDRESS_LO_MASK));
                }
                w.fifo_registers_changed();
            }),
        );

        let (r, w) = (Arc::clone(self), Arc::clone(self));
        mapping.register(
            address + 2,
            Box::new(move |_| (get(&r.fifo) >> 16) as u16),
            Box::new(move |_, value| {
                {
                    let _gate = w.fifo.gate().enter();
                    let old = get(&w.fifo);
                    set(
                        &w.fifo,
                        (old & 0x0000_FFFF) | (u32::from(value & ADDRESS_HI_MASK) << 16),
                    );
                }
                w.fifo_registers_changed();
            }),
        );
    }

    /// Wake the rendering thread after a guest register write
    fn fifo_registers_changed(&self) {
        let mut ctl = lock_unpoisoned(&self.control);
        ctl.pending_data = true;
        self.wakeup.notify_all();
    }
}
