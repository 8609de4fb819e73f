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

//! Command processor FIFO register model
//!
//! The CPU streams GX commands into a ring buffer in main RAM; the command
//! processor (CP) drains it. This module keeps the CP's view of that ring:
//! its bounds, both pointers, watermarks, breakpoint, PE token and the enable
//! and latched-condition flags.
//!
//! # Ring Layout
//!
//! ```text
//!  base                 read_pointer          write_pointer          end
//!   │                        │  ◄── distance ──►  │                   │
//!   ▼                        ▼                    ▼                   ▼
//!   ┌────────────────────────┬────────────────────┬───────────────────┐
//!   │        consumed        │      pending       │       free        │
//!   └────────────────────────┴────────────────────┴───────────────────┘
//! ```
//!
//! Both pointers wrap to `base` on reaching `end`. The read/write distance is
//! always derived from the two pointers, so it can never disagree with them.
//!
//! # Threading
//!
//! Every field is an atomic. The producer (CPU thread) owns the write pointer,
//! the consumer (rendering thread) owns the read pointer, and the guest may
//! rewrite either through MMIO. Foreign threads that only need a race-free read
//! position use [`CommandFifo::safe_read_pointer`], which the consumer publishes
//! at checkpoints.
//!
//! The `set_*` register writes, `clear`, `init_ring`, `take_token_interrupt`
//! and `restore` enter the [`WriteGate`] first, so a thread other than the
//! pause lock owner blocks until the lock is released. The consumer and the
//! gather pipe never enter it.
//!
//! # Conditions
//!
//! Watermark and breakpoint conditions are edge-triggered: they latch once when
//! the threshold is crossed (and the matching interrupt is enabled) and stay
//! latched until the guest clears them.

pub mod gate;
pub mod registers;
#[cfg(test)]
mod tests;

use self::gate::WriteGate;
use self::registers::{CpClear, CpControl, CpStatus, FifoFlags};
use crate::core::error::Result;
use crate::core::interrupt::{interrupts, InterruptController};
use crate::core::memory::GuestMemory;
use crate::core::save_state::FifoState;
use std::sync::atomic::{AtomicBool, AtomicU16, AtomicU32, Ordering};
use std::sync::Arc;

/// Command processor FIFO
pub struct CommandFifo {
    base: AtomicU32,
    end: AtomicU32,
    hi_watermark: AtomicU32,
    lo_watermark: AtomicU32,
    write_pointer: AtomicU32,
    read_pointer: AtomicU32,
    breakpoint: AtomicU32,
    safe_read_pointer: AtomicU32,

    /// Processor interface write pointer (where the next gather pipe burst lands)
    cpu_write_pointer: AtomicU32,

    token: AtomicU16,
    token_pending: AtomicBool,

    flags: AtomicU32,

    interrupts: Arc<InterruptController>,

    /// Closed while a pause lock is held
    gate: WriteGate,
}

impl CommandFifo {
    /// Create a zeroed FIFO
    pub fn new(interrupts: Arc<InterruptController>) -> Self {
        Self {
            base: AtomicU32::new(0),
            end: AtomicU32::new(0),
            hi_watermark: AtomicU32::new(0),
            lo_watermark: AtomicU32::new(0),
            write_pointer: AtomicU32::new(0),
            read_pointer: AtomicU32::new(0),
            breakpoint: AtomicU32::new(0),
            safe_read_pointer: AtomicU32::new(0),
            cpu_write_pointer: AtomicU32::new(0),
            token: AtomicU16::new(0),
            token_pending: AtomicBool::new(false),
            flags: AtomicU32::new(0),
            interrupts,
            gate: WriteGate::new(),
        }
    }

    /// Return every register to zero and drop the CP interrupt line
    pub fn reset(&self) {
        for reg in [
            &self.base,
            &self.end,
            &self.hi_watermark,
            &self.lo_watermark,
            &self.write_pointer,
            &self.read_pointer,
            &self.breakpoint,
            &self.safe_read_pointer,
            &self.cpu_write_pointer,
            &self.flags,
        ] {
            reg.store(0, Ordering::Release);
        }
        self.token.store(0, Ordering::Release);
        self.token_pending.store(false, Ordering::Release);
        self.interrupts
            .acknowledge(interrupts::CP | interrupts::PE_TOKEN);
    }

    // ---------------------------------------------------------------------
    // Bounds

    /// Ring start address
    pub fn base(&self) -> u32 {
        self.base.load(Ordering::Acquire)
    }

    /// Ring end address (exclusive)
    pub fn end(&self) -> u32 {
        self.end.load(Ordering::Acquire)
    }

    /// Ring size in bytes (0 while unconfigured)
    pub fn size(&self) -> u32 {
        self.end().saturating_sub(self.base())
    }

    /// Gate guarding register writes against a held pause lock
    pub fn gate(&self) -> &WriteGate {
        &self.gate
    }

    /// Set the ring start address
    pub fn set_base(&self, base: u32) {
        let _gate = self.gate.enter();
        self.store_base(base);
    }

    pub(crate) fn store_base(&self, base: u32) {
        self.base.store(base, Ordering::Release);
        log::debug!("CP FIFO base = 0x{:08X}", base);
    }

    /// Set the ring end address
    pub fn set_end(&self, end: u32) {
        let _gate = self.gate.enter();
        self.store_end(end);
    }

    pub(crate) fn store_end(&self, end: u32) {
        self.end.store(end, Ordering::Release);
        log::debug!("CP FIFO end = 0x{:08X}", end);
    }

    /// Configure both bounds and place every pointer at `base`
    ///
    /// This is what a guest's FIFO init sequence amounts to.
    pub fn init_ring(&self, base: u32, end: u32) {
        let _gate = self.gate.enter();
        self.store_base(base);
        self.store_end(end);
        self.cpu_write_pointer.store(base, Ordering::Release);
        self.write_pointer.store(base, Ordering::Release);
        self.read_pointer.store(base, Ordering::Release);
        self.safe_read_pointer.store(base, Ordering::Release);
        self.update_conditions();
    }

    /// Wrap an address into `[base, end)`
    pub fn wrap(&self, addr: u32) -> u32 {
        let base = self.base();
        let size = self.size();
        if size == 0 || addr < base {
            return addr;
        }
        base + (addr - base) % size
    }

    // ---------------------------------------------------------------------
    // Pointers

    /// CP write pointer
    pub fn write_pointer(&self) -> u32 {
        self.write_pointer.load(Ordering::Acquire)
    }

    /// CP read pointer
    pub fn read_pointer(&self) -> u32 {
        self.read_pointer.load(Ordering::Acquire)
    }

    /// Read pointer as last published by the consumer
    pub fn safe_read_pointer(&self) -> u32 {
        self.safe_read_pointer.load(Ordering::Acquire)
    }

    /// Processor interface write pointer
    pub fn cpu_write_pointer(&self) -> u32 {
        self.cpu_write_pointer.load(Ordering::Acquire)
    }

    /// Bytes written but not yet consumed
    ///
    /// `(write_pointer - read_pointer) mod (end - base)`.
    pub fn read_write_distance(&self) -> u32 {
        let size = self.size();
        if size == 0 {
            return 0;
        }
        let wp = self.write_pointer() as i64;
        let rp = self.read_pointer() as i64;
        (wp - rp).rem_euclid(size as i64) as u32
    }

    /// Guest write to the write pointer register
    ///
    /// Also moves the processor interface pointer, since a guest relocating the
    /// CP write pointer is re-initialising the gather pipe target as well.
    pub fn set_write_pointer(&self, addr: u32) {
        let _gate = self.gate.enter();
        self.store_write_pointer(addr);
    }

    pub(crate) fn store_write_pointer(&self, addr: u32) {
        self.write_pointer.store(addr, Ordering::Release);
        self.cpu_write_pointer.store(addr, Ordering::Release);
        log::debug!("CP FIFO write pointer = 0x{:08X}", addr);
        self.update_conditions();
    }

    /// Guest write to the read pointer register
    pub fn set_read_pointer(&self, addr: u32) {
        let _gate = self.gate.enter();
        self.store_read_pointer(addr);
    }

    pub(crate) fn store_read_pointer(&self, addr: u32) {
        self.read_pointer.store(addr, Ordering::Release);
        self.safe_read_pointer.store(addr, Ordering::Release);
        log::debug!("CP FIFO read pointer = 0x{:08X}", addr);
        self.update_conditions();
    }

    /// Guest write to the distance register
    ///
    /// The read pointer is moved so the distance invariant keeps holding.
    pub fn set_read_write_distance(&self, distance: u32) {
        let _gate = self.gate.enter();
        self.store_read_write_distance(distance);
    }

    pub(crate) fn store_read_write_distance(&self, distance: u32) {
        let size = self.size();
        if size == 0 {
            return;
        }
        let distance = distance % size;
        let base = self.base() as i64;
        let offset = (self.write_pointer() as i64 - base - distance as i64).rem_euclid(size as i64);
        let rp = (base + offset) as u32;
        self.read_pointer.store(rp, Ordering::Release);
        self.safe_read_pointer.store(rp, Ordering::Release);
        log::debug!(
            "CP FIFO distance = 0x{:08X} (read pointer 0x{:08X})",
            distance,
            rp
        );
        self.update_conditions();
    }

    /// Reserve `len` bytes at the processor interface pointer
    ///
    /// Returns the address the burst must be written to. The CP write pointer
    /// is untouched until [`sync_write_pointer`](Self::sync_write_pointer).
    pub fn advance_cpu_write_pointer(&self, len: u32) -> u32 {
        let addr = self.cpu_write_pointer();
        let next = self.wrap(addr + len);
        self.cpu_write_pointer.store(next, Ordering::Release);
        addr
    }

    /// Publish the processor interface pointer as the CP write pointer
    ///
    /// Returns `false` (and does nothing) while the gather pipe is unlinked.
    pub fn sync_write_pointer(&self) -> bool {
        if !self.flags().contains(FifoFlags::LINK_ENABLE) {
            return false;
        }
        let cpu_wp = self.cpu_write_pointer();
        let previous = self.write_pointer.swap(cpu_wp, Ordering::AcqRel);
        if previous != cpu_wp {
            self.update_conditions();
        }
        true
    }

    /// Consume `len` bytes at the read pointer
    pub fn advance_read_pointer(&self, len: u32) {
        let old = self.read_pointer();
        let new = self.wrap(old + len);
        self.read_pointer.store(new, Ordering::Release);

        if self.flags().contains(FifoFlags::BP_ENABLE) {
            let size = self.size() as i64;
            if size > 0 {
                let to_bp = (self.breakpoint() as i64 - old as i64).rem_euclid(size);
                if to_bp > 0 && to_bp <= len as i64 {
                    self.latch_breakpoint();
                }
            }
        }

        self.update_conditions();
    }

    /// Publish the current read pointer for foreign readers
    pub fn update_safe_read_pointer(&self) {
        self.safe_read_pointer
            .store(self.read_pointer(), Ordering::Release);
    }

    /// Whether the consumer may execute the command at the read pointer
    pub fn can_read(&self) -> bool {
        let flags = self.flags();
        flags.contains(FifoFlags::READ_ENABLE)
            && !(flags.contains(FifoFlags::BP_ENABLE) && flags.contains(FifoFlags::BP_ACTIVE))
            && self.read_write_distance() > 0
    }

    /// Latch the breakpoint if the read pointer sits on it
    ///
    /// Returns `true` if consumption must stop.
    pub fn check_breakpoint(&self) -> bool {
        let flags = self.flags();
        if !flags.contains(FifoFlags::BP_ENABLE) {
            return false;
        }
        if flags.contains(FifoFlags::BP_ACTIVE) {
            return true;
        }
        if self.read_pointer() == self.breakpoint() {
            self.latch_breakpoint();
            return true;
        }
        false
    }

    /// Copy bytes out of the ring starting at `addr`, wrapping at `end`
    pub fn read_ring(&self, memory: &dyn GuestMemory, addr: u32, buf: &mut [u8]) -> Result<()> {
        let end = self.end();
        let until_end = end.saturating_sub(addr) as usize;
        if self.size() == 0 || buf.len() <= until_end {
            return memory.read(addr, buf);
        }
        let (head, tail) = buf.split_at_mut(until_end);
        memory.read(addr, head)?;
        memory.read(self.base(), tail)
    }

    /// Copy bytes into the ring starting at `addr`, wrapping at `end`
    pub fn write_ring(&self, memory: &dyn GuestMemory, addr: u32, data: &[u8]) -> Result<()> {
        let end = self.end();
        let until_end = end.saturating_sub(addr) as usize;
        if self.size() == 0 || data.len() <= until_end {
            return memory.write(addr, data);
        }
        let (head, tail) = data.split_at(until_end);
        memory.write(addr, head)?;
        memory.write(self.base(), tail)
    }

    // ---------------------------------------------------------------------
    // Thresholds

    /// High watermark
    pub fn hi_watermark(&self) -> u32 {
        self.hi_watermark.load(Ordering::Acquire)
    }

    /// Low watermark
    pub fn lo_watermark(&self) -> u32 {
        self.lo_watermark.load(Ordering::Acquire)
    }

    /// Breakpoint address
    pub fn breakpoint(&self) -> u32 {
        self.breakpoint.load(Ordering::Acquire)
    }

    /// Set the high watermark
    pub fn set_hi_watermark(&self, value: u32) {
        let _gate = self.gate.enter();
        self.store_hi_watermark(value);
    }

    pub(crate) fn store_hi_watermark(&self, value: u32) {
        self.hi_watermark.store(value, Ordering::Release);
        self.update_conditions();
    }

    /// Set the low watermark
    pub fn set_lo_watermark(&self, value: u32) {
        let _gate = self.gate.enter();
        self.store_lo_watermark(value);
    }

    pub(crate) fn store_lo_watermark(&self, value: u32) {
        self.lo_watermark.store(value, Ordering::Release);
        self.update_conditions();
    }

    /// Set the breakpoint address
    pub fn set_breakpoint(&self, addr: u32) {
        let _gate = self.gate.enter();
        self.store_breakpoint(addr);
    }

    pub(crate) fn store_breakpoint(&self, addr: u32) {
        self.breakpoint.store(addr, Ordering::Release);
        log::debug!("CP FIFO breakpoint = 0x{:08X}", addr);
    }

    // ---------------------------------------------------------------------
    // Flags and registers

    /// Current flag word
    pub fn flags(&self) -> FifoFlags {
        FifoFlags::from_bits_truncate(self.flags.load(Ordering::Acquire))
    }

    /// Control register value
    pub fn control(&self) -> CpControl {
        self.flags().to_control()
    }

    /// Guest write to the control register
    ///
    /// Disarming the breakpoint also clears a latched breakpoint.
    pub fn set_control(&self, control: CpControl) {
        let _gate = self.gate.enter();
        self.store_control(control);
    }

    pub(crate) fn store_control(&self, control: CpControl) {
        let enables = FifoFlags::from_control(control);
        let mut clear = FifoFlags::CONTROL_MASK.difference(enables);
        if !enables.contains(FifoFlags::BP_ENABLE) {
            clear |= FifoFlags::BP_ACTIVE;
        }
        self.flags.fetch_and(!clear.bits(), Ordering::AcqRel);
        self.flags.fetch_or(enables.bits(), Ordering::AcqRel);
        log::debug!("CP control = {:?}", control);
        self.update_conditions();
    }

    /// Guest write to the clear register
    pub fn clear(&self, clear: CpClear) {
        let _gate = self.gate.enter();
        self.store_clear(clear);
    }

    pub(crate) fn store_clear(&self, clear: CpClear) {
        let mut bits = FifoFlags::empty();
        if clear.contains(CpClear::HI_WATERMARK) {
            bits |= FifoFlags::HI_WATERMARK_ACTIVE;
        }
        if clear.contains(CpClear::LO_WATERMARK) {
            bits |= FifoFlags::LO_WATERMARK_ACTIVE;
        }
        self.flags.fetch_and(!bits.bits(), Ordering::AcqRel);
        self.refresh_interrupt();
    }

    /// Status register value
    pub fn status(&self) -> CpStatus {
        let flags = self.flags();
        let mut status = CpStatus::empty();
        status.set(
            CpStatus::HI_WATERMARK,
            flags.contains(FifoFlags::HI_WATERMARK_ACTIVE),
        );
        status.set(
            CpStatus::LO_WATERMARK,
            flags.contains(FifoFlags::LO_WATERMARK_ACTIVE),
        );
        status.set(CpStatus::BREAKPOINT, flags.contains(FifoFlags::BP_ACTIVE));
        let idle = !self.can_read();
        status.set(CpStatus::READ_IDLE, idle);
        status.set(CpStatus::COMMAND_IDLE, idle);
        status
    }

    /// Whether the high watermark condition is latched
    pub fn hi_watermark_active(&self) -> bool {
        self.flags().contains(FifoFlags::HI_WATERMARK_ACTIVE)
    }

    /// Whether the low watermark condition is latched
    pub fn lo_watermark_active(&self) -> bool {
        self.flags().contains(FifoFlags::LO_WATERMARK_ACTIVE)
    }

    /// Whether the breakpoint is latched
    pub fn breakpoint_active(&self) -> bool {
        self.flags().contains(FifoFlags::BP_ACTIVE)
    }

    // ---------------------------------------------------------------------
    // PE token

    /// Last token written by the consumer
    pub fn token(&self) -> u16 {
        self.token.load(Ordering::Acquire)
    }

    /// Record a token; the interrupt variant latches it for the CPU
    pub fn set_token(&self, token: u16, interrupt: bool) {
        let _gate = self.gate.enter();
        self.store_token(token, interrupt);
    }

    /// Token write from the command processor itself
    pub(crate) fn store_token(&self, token: u16, interrupt: bool) {
        self.token.store(token, Ordering::Release);
        if interrupt {
            self.token_pending.store(true, Ordering::Release);
            self.interrupts.request(interrupts::PE_TOKEN);
        }
        log::trace!("PE token 0x{:04X} (interrupt: {})", token, interrupt);
    }

    /// Take a pending token interrupt
    ///
    /// Returns the token once per raise and deasserts the PE token line.
    pub fn take_token_interrupt(&self) -> Option<u16> {
        let _gate = self.gate.enter();
        if self.token_pending.swap(false, Ordering::AcqRel) {
            self.interrupts.acknowledge(interrupts::PE_TOKEN);
            Some(self.token())
        } else {
            None
        }
    }

    // ---------------------------------------------------------------------
    // Savestate

    /// Capture every register in savestate order
    pub fn snapshot(&self) -> FifoState {
        let flags = self.flags();
        FifoState {
            base: self.base(),
            end: self.end(),
            hi_watermark: self.hi_watermark(),
            lo_watermark: self.lo_watermark(),
            read_write_distance: self.read_write_distance(),
            write_pointer: self.write_pointer(),
            read_pointer: self.read_pointer(),
            breakpoint: self.breakpoint(),
            safe_read_pointer: self.safe_read_pointer(),
            token: self.token(),
            token_pending: self.token_pending.load(Ordering::Acquire),
            cpu_write_pointer: self.cpu_write_pointer(),
            flags: flags.bits(),
        }
    }

    /// Restore registers captured by [`snapshot`](Self::snapshot)
    pub fn restore(&self, state: &FifoState) {
        let _gate = self.gate.enter();
        self.store_state(state);
    }

    pub(crate) fn store_state(&self, state: &FifoState) {
        self.base.store(state.base, Ordering::Release);
        self.end.store(state.end, Ordering::Release);
        self.hi_watermark.store(state.hi_watermark, Ordering::Release);
        self.lo_watermark.store(state.lo_watermark, Ordering::Release);
        self.write_pointer.store(state.write_pointer, Ordering::Release);
        self.read_pointer.store(state.read_pointer, Ordering::Release);
        self.breakpoint.store(state.breakpoint, Ordering::Release);
        self.safe_read_pointer
            .store(state.safe_read_pointer, Ordering::Release);
        self.cpu_write_pointer
            .store(state.cpu_write_pointer, Ordering::Release);
        self.token.store(state.token, Ordering::Release);
        self.token_pending
            .store(state.token_pending, Ordering::Release);
        self.flags.store(
            FifoFlags::from_bits_truncate(state.flags).bits(),
            Ordering::Release,
        );
        self.interrupts
            .set_line(interrupts::PE_TOKEN, state.token_pending);
        self.refresh_interrupt();
    }

    // ---------------------------------------------------------------------
    // Edge detection

    /// Re-evaluate watermark levels after any pointer or threshold change
    fn update_conditions(&self) {
        let distance = self.read_write_distance();
        self.edge(
            FifoFlags::HI_OVER,
            distance > self.hi_watermark(),
            FifoFlags::HI_WATERMARK_INT,
            FifoFlags::HI_WATERMARK_ACTIVE,
        );
        self.edge(
            FifoFlags::LO_UNDER,
            distance < self.lo_watermark(),
            FifoFlags::LO_WATERMARK_INT,
            FifoFlags::LO_WATERMARK_ACTIVE,
        );
        self.refresh_interrupt();
    }

    /// Track a level bit and latch `active` on its rising edge if `enable` is set
    fn edge(&self, level_bit: FifoFlags, level: bool, enable: FifoFlags, active: FifoFlags) {
        if level {
            let previous = FifoFlags::from_bits_truncate(
                self.flags.fetch_or(level_bit.bits(), Ordering::AcqRel),
            );
            if !previous.contains(level_bit) && previous.contains(enable) {
                self.flags.fetch_or(active.bits(), Ordering::AcqRel);
                log::debug!("CP FIFO condition latched: {:?}", active);
            }
        } else {
            self.flags.fetch_and(!level_bit.bits(), Ordering::AcqRel);
        }
    }

    fn latch_breakpoint(&self) {
        let previous = FifoFlags::from_bits_truncate(
            self.flags
                .fetch_or(FifoFlags::BP_ACTIVE.bits(), Ordering::AcqRel),
        );
        if !previous.contains(FifoFlags::BP_ACTIVE) {
            log::debug!("CP FIFO breakpoint hit at 0x{:08X}", self.breakpoint());
        }
        self.refresh_interrupt();
    }

    fn refresh_interrupt(&self) {
        self.interrupts
            .set_line(interrupts::CP, self.flags().interrupt_asserted());
    }
}
