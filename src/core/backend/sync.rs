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

//! Pause/lock quiescence and CPU/GPU pacing
//!
//! All coordination between the CPU thread, the rendering thread and any
//! control thread goes through one mutex-protected [`ControlState`] and one
//! condition variable. The rendering thread only parks at command boundaries,
//! so once `pause_and_lock(true, _)` returns the GPU is between two commands
//! and stays there until the lock is released.
//!
//! # Lock Protocol
//!
//! ```text
//!  control thread                         rendering thread
//!  ──────────────                         ────────────────
//!  owner = me, hold = true
//!  close write gate
//!  pause_flag = true  ───────────────►   run_gpu stops before next command
//!  wait until parked  ◄───────────────   parked = true, notify, wait
//!  ... inspect / savestate ...
//!  owner = None, hold = false, open gate
//!  publish deferred bursts, notify ───►  resumes where it stopped
//! ```
//!
//! In single-core mode there is no rendering loop; the CPU thread runs the
//! GPU inline instead, and the lock waits for that run to stop.

use super::{violation, BackendPhase, VideoBackend};
use crate::core::error::{Result, UsageViolation};
use crate::core::timing::TickCount;
use crate::core::{lock_unpoisoned, wait_unpoisoned};
use std::collections::VecDeque;
use std::sync::atomic::Ordering;
use std::sync::MutexGuard;
use std::thread::{self, ThreadId};

use super::field::FieldRect;

/// Emulation state reported by the host
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmuState {
    Play,
    Pause,
    Stop,
}

/// Shared loop control state
#[derive(Debug)]
pub(crate) struct ControlState {
    /// Thread holding the pause lock
    pub(crate) lock_owner: Option<ThreadId>,

    /// GPU must stay parked (locked, or paused after an unlock)
    pub(crate) hold: bool,

    /// Rendering thread is inside `enter_loop`
    pub(crate) loop_active: bool,

    /// Rendering thread is waiting at a command boundary
    pub(crate) parked: bool,

    /// Single-core GPU run in progress on the CPU thread
    pub(crate) inline_running: bool,

    /// Loop consumes FIFO data (`run_loop`)
    pub(crate) run_enabled: bool,

    pub(crate) exit_requested: bool,

    /// Set by each burst, cleared by the rendering thread before it runs
    pub(crate) pending_data: bool,

    /// Bursts arrived while locked and still need publishing
    pub(crate) deferred_publish: bool,

    /// Completed fields waiting for the rendering thread
    pub(crate) present_queue: VecDeque<FieldRect>,
}

impl ControlState {
    pub(crate) fn new() -> Self {
        Self {
            lock_owner: None,
            hold: false,
            loop_active: false,
            parked: false,
            inline_running: false,
            run_enabled: true,
            exit_requested: false,
            pending_data: false,
            deferred_publish: false,
            present_queue: VecDeque::new(),
        }
    }

    /// Clear everything except which GPU runs are in progress
    pub(crate) fn reset(&mut self) {
        let (loop_active, inline_running) = (self.loop_active, self.inline_running);
        *self = Self::new();
        self.loop_active = loop_active;
        self.inline_running = inline_running;
    }
}

impl VideoBackend {
    // ---------------------------------------------------------------------
    // Pause/lock

    /// Freeze (`do_lock = true`) or release (`do_lock = false`) the GPU
    ///
    /// Locking blocks until the rendering thread is parked at a command
    /// boundary (and for any inline single-core run to stop), or returns at
    /// once if the GPU is idle. While locked, no FIFO, field or EFB mutation
    /// happens except by the owner: the GPU stays parked, gather pipe bursts
    /// are held back from the FIFO, and writes from other threads wait.
    ///
    /// Releasing with `unpause_on_unlock` resumes the loop; otherwise it stays
    /// paused until [`resume`](Self::resume).
    pub fn pause_and_lock(&self, do_lock: bool, unpause_on_unlock: bool) -> Result<()> {
        let me = thread::current().id();
        let mut ctl = lock_unpoisoned(&self.control);

        if do_lock {
            if ctl.lock_owner == Some(me) {
                return Err(violation(UsageViolation::PauseLockReentered));
            }
            while ctl.lock_owner.is_some() {
                ctl = wait_unpoisoned(&self.wakeup, ctl);
            }

            ctl.lock_owner = Some(me);
            ctl.hold = true;
            self.fifo.gate().close(me);
            self.pause_flag.store(true, Ordering::Release);
            self.wakeup.notify_all();

            let on_render_thread = self.is_render_thread();
            while (ctl.loop_active && !ctl.parked && !on_render_thread) || ctl.inline_running {
                ctl = wait_unpoisoned(&self.wakeup, ctl);
            }
            drop(ctl);

            self.fifo.update_safe_read_pointer();
            self.transition_phase(BackendPhase::Running, BackendPhase::Paused);
            log::debug!("Video backend paused and locked");
            Ok(())
        } else {
            if ctl.lock_owner != Some(me) {
                return Err(violation(UsageViolation::UnbalancedPauseLock));
            }
            ctl.lock_owner = None;
            self.fifo.gate().open();
            self.publish_deferred(&mut ctl);

            if unpause_on_unlock {
                ctl.hold = false;
                self.pause_flag.store(false, Ordering::Release);
            }
            self.wakeup.notify_all();
            drop(ctl);

            if unpause_on_unlock {
                self.transition_phase(BackendPhase::Paused, BackendPhase::Running);
            }
            log::debug!(
                "Video backend unlocked ({})",
                if unpause_on_unlock { "resumed" } else { "still paused" }
            );
            Ok(())
        }
    }

    /// Resume a loop left paused by `pause_and_lock(false, false)`
    ///
    /// Does nothing while the lock is still held.
    pub fn resume(&self) {
        let mut ctl = lock_unpoisoned(&self.control);
        if ctl.lock_owner.is_some() {
            log::warn!("resume() ignored while the pause lock is held");
            return;
        }
        ctl.hold = false;
        self.pause_flag.store(false, Ordering::Release);
        self.wakeup.notify_all();
        drop(ctl);
        self.transition_phase(BackendPhase::Paused, BackendPhase::Running);
    }

    /// Whether the GPU is held (locked or paused)
    pub fn is_paused(&self) -> bool {
        lock_unpoisoned(&self.control).hold
    }

    /// Whether some thread holds the pause lock
    pub fn is_locked(&self) -> bool {
        lock_unpoisoned(&self.control).lock_owner.is_some()
    }

    /// Whether the calling thread holds the pause lock
    pub fn holds_lock(&self) -> bool {
        lock_unpoisoned(&self.control).lock_owner == Some(thread::current().id())
    }

    fn publish_deferred(&self, ctl: &mut MutexGuard<'_, ControlState>) {
        if ctl.deferred_publish {
            ctl.deferred_publish = false;
            if self.fifo.sync_write_pointer() {
                ctl.pending_data = true;
            }
            log::trace!(
                "Published deferred bursts, write pointer 0x{:08X}",
                self.fifo.write_pointer()
            );
        }
    }

    // ---------------------------------------------------------------------
    // Producer side

    /// Signal that the gather pipe wrote a burst at the processor interface pointer
    ///
    /// Publishes the new write pointer (unless the pause lock is held, in
    /// which case publication waits for the unlock) and wakes the rendering
    /// thread. In single-core mode the GPU then runs inline.
    pub fn gather_pipe_bursted(&self) {
        let run_inline = {
            let mut ctl = lock_unpoisoned(&self.control);
            if ctl.lock_owner.is_some() {
                ctl.deferred_publish = true;
            } else {
                self.fifo.sync_write_pointer();
            }
            ctl.pending_data = true;
            self.wakeup.notify_all();
            self.begin_inline_run(&mut ctl)
        };

        if run_inline {
            self.run_gpu_inline();
        }
    }

    /// Claim the inline GPU run; `false` if it may not run now
    fn begin_inline_run(&self, ctl: &mut ControlState) -> bool {
        let runnable = !self.config.dual_core
            && !ctl.hold
            && ctl.run_enabled
            && !ctl.inline_running
            && self.is_initialized();
        if runnable {
            ctl.inline_running = true;
        }
        runnable
    }

    /// Run the GPU on the calling thread, then let a waiting locker in
    fn run_gpu_inline(&self) {
        self.run_gpu();
        let mut ctl = lock_unpoisoned(&self.control);
        ctl.inline_running = false;
        self.wakeup.notify_all();
    }

    /// Account for `ticks` of CPU time and apply backpressure
    ///
    /// Blocks while the budget exceeds `sync_gpu_max_distance` and the GPU is
    /// able to make progress (with determinism requested, until the FIFO is
    /// drained). Returns the ticks the caller should treat as consumed: any
    /// overshoot the GPU could not work off is discarded and subtracted.
    pub fn sync(&self, ticks: TickCount) -> TickCount {
        if !self.is_initialized() {
            return ticks;
        }

        self.budget.add(ticks);

        if !self.config.dual_core {
            let runnable = self.begin_inline_run(&mut lock_unpoisoned(&self.control));
            if runnable {
                self.run_gpu_inline();
            }
        } else {
            let determinism = self.want_determinism.load(Ordering::Acquire);
            let mut ctl = lock_unpoisoned(&self.control);
            if self.config.sync_gpu {
                self.wakeup.notify_all();
            }
            while self.gpu_can_progress(&ctl) && (determinism || self.budget.exceeded()) {
                ctl = wait_unpoisoned(&self.wakeup, ctl);
            }
        }

        if !self.fifo.can_read() {
            self.budget.reset();
            return ticks;
        }

        let discarded = self.budget.clamp_to_max();
        if discarded > 0 {
            log::trace!("GPU sync: discarded {} ticks of overshoot", discarded);
        }
        (ticks - discarded).max(0)
    }

    fn gpu_can_progress(&self, ctl: &ControlState) -> bool {
        ctl.loop_active
            && !ctl.hold
            && ctl.run_enabled
            && !ctl.exit_requested
            && !self.status.is_invalid()
            && self.fifo.can_read()
    }

    // ---------------------------------------------------------------------
    // Loop control

    /// Enable or disable FIFO consumption by the loop
    pub fn run_loop(&self, enable: bool) {
        let mut ctl = lock_unpoisoned(&self.control);
        ctl.run_enabled = enable;
        self.wakeup.notify_all();
        log::debug!("GPU loop {}", if enable { "running" } else { "stopped" });
    }

    /// Map a host emulation state change onto the loop
    pub fn emu_state_change(&self, state: EmuState) {
        log::info!("Emulation state changed to {:?}", state);
        self.run_loop(state == EmuState::Play);
    }

    /// Ask `enter_loop` to return
    pub fn exit_loop(&self) {
        let mut ctl = lock_unpoisoned(&self.control);
        ctl.exit_requested = true;
        self.wakeup.notify_all();
    }

    /// Wait until there is work for the rendering thread
    ///
    /// Returns the fields to present, or `None` when the loop must exit.
    pub(super) fn wait_for_work(&self) -> Option<Vec<FieldRect>> {
        let mut ctl = lock_unpoisoned(&self.control);
        // Anyone waiting on GPU progress re-checks under the lock
        self.wakeup.notify_all();

        loop {
            if ctl.exit_requested || self.status.is_invalid() {
                return None;
            }
            if !ctl.hold && ctl.run_enabled && self.has_work(&ctl) {
                break;
            }

            if !ctl.parked {
                ctl.parked = true;
                self.fifo.update_safe_read_pointer();
                if !self.fifo.can_read() {
                    self.budget.reset();
                }
                self.wakeup.notify_all();
            }
            ctl = wait_unpoisoned(&self.wakeup, ctl);
        }

        ctl.parked = false;
        ctl.pending_data = false;
        Some(ctl.present_queue.drain(..).collect())
    }

    fn has_work(&self, ctl: &ControlState) -> bool {
        let fifo_ready =
            self.fifo.can_read() && (!self.config.sync_gpu || self.budget.has_budget());
        fifo_ready
            || ctl.pending_data
            || !ctl.present_queue.is_empty()
            || self.determinism_dirty.load(Ordering::Acquire)
    }
}
