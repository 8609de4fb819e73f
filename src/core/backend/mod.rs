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

//! Video backend
//!
//! A [`VideoBackend`] ties one render device to the command FIFO, the GPU
//! state and the field bookkeeping, and runs the rendering thread's loop.
//!
//! # Threads
//!
//! - **CPU thread**: writes commands through the gather pipe, brackets fields
//!   and calls [`sync`](VideoBackend::sync) for pacing.
//! - **Rendering thread**: calls `prepare`, `enter_loop` and `cleanup`, and is
//!   the only thread that talks to the device after initialization.
//! - **Control threads** (debugger, savestates, UI): use
//!   [`pause_and_lock`](VideoBackend::pause_and_lock) and the gateway calls.
//!
//! # Lifecycle
//!
//! ```text
//! Uninitialized ─initialize─► Initialized ─prepare─► Preparing ─enter_loop─► Running ⇄ Paused
//!       ▲                          ▲                     │  ▲                    │
//!       │                          └──────cleanup────────┘  └───loop returns─────┘
//!       └──────────────── shutdown (via Shutdown) ──────────────────────────────────
//! ```

pub mod device;
pub mod field;
pub mod mmio;
pub mod registry;
pub mod sync;
#[cfg(test)]
mod tests;

pub use device::{DeviceStatus, Frame, NullDevice, RenderDevice, SoftwareDevice, WindowHandle};
pub use field::{FieldParity, FieldRect, FieldSnapshot, FieldState};
pub use registry::{BackendRegistry, VideoContext};
pub use sync::EmuState;

use self::sync::ControlState;
use crate::core::config::VideoConfig;
use crate::core::error::{Result, UsageViolation, VideoError};
use crate::core::fifo::CommandFifo;
use crate::core::gpu::opcodes::{self, MAX_HEADER_LEN};
use crate::core::gpu::{EfbAccessType, ExecContext, GpuState, PerfQueryType};
use crate::core::interrupt::InterruptController;
use crate::core::memory::GuestMemory;
use crate::core::osd::OsdMessages;
use crate::core::save_state::VideoState;
use crate::core::timing::SyncBudget;
use crate::core::{lock_unpoisoned, wait_unpoisoned};
use std::sync::atomic::{AtomicBool, AtomicU16, AtomicU64, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::thread::{self, ThreadId};
use std::time::Instant;

/// Backend lifecycle phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendPhase {
    Uninitialized,
    Initialized,
    Preparing,
    Running,
    Paused,
    CleaningUp,
    Shutdown,
}

/// Log a usage violation and turn it into an error
pub(crate) fn violation(v: UsageViolation) -> VideoError {
    log::error!("{}", v);
    VideoError::Usage(v)
}

/// One video backend: device, FIFO, GPU state and loop synchronization
pub struct VideoBackend {
    name: String,
    display_name: String,

    device: Mutex<Box<dyn RenderDevice>>,
    status: DeviceStatus,

    memory: Arc<dyn GuestMemory>,
    interrupts: Arc<InterruptController>,
    config: VideoConfig,

    fifo: CommandFifo,
    gpu: Mutex<GpuState>,
    fields: Mutex<FieldState>,
    osd: Mutex<OsdMessages>,

    phase: Mutex<BackendPhase>,
    initialized: AtomicBool,
    render_thread: Mutex<Option<ThreadId>>,

    control: Mutex<ControlState>,
    wakeup: Condvar,

    /// Fast-path copy of "stop before the next command"
    pause_flag: AtomicBool,

    budget: SyncBudget,

    want_determinism: AtomicBool,
    determinism_dirty: AtomicBool,
    rendering_enabled: AtomicBool,

    /// Value last written to the CP perf select register
    perf_select: AtomicU16,

    frames_presented: AtomicU64,
}

impl VideoBackend {
    /// Create an uninitialized backend around `device`
    pub fn new(device: Box<dyn RenderDevice>, context: &VideoContext) -> Self {
        let config = context.config.clone();
        Self {
            name: device.name().to_string(),
            display_name: device.display_name().to_string(),
            device: Mutex::new(device),
            status: DeviceStatus::new(),
            memory: Arc::clone(&context.memory),
            interrupts: Arc::clone(&context.interrupts),
            fifo: CommandFifo::new(Arc::clone(&context.interrupts)),
            gpu: Mutex::new(GpuState::new(config.efb_width, config.efb_height)),
            fields: Mutex::new(FieldState::new()),
            osd: Mutex::new(OsdMessages::new()),
            phase: Mutex::new(BackendPhase::Uninitialized),
            initialized: AtomicBool::new(false),
            render_thread: Mutex::new(None),
            control: Mutex::new(ControlState::new()),
            wakeup: Condvar::new(),
            pause_flag: AtomicBool::new(false),
            budget: SyncBudget::new(config.sync_gpu_max_distance, config.sync_gpu_min_distance),
            want_determinism: AtomicBool::new(config.want_determinism),
            determinism_dirty: AtomicBool::new(false),
            rendering_enabled: AtomicBool::new(true),
            perf_select: AtomicU16::new(0),
            frames_presented: AtomicU64::new(0),
            config,
        }
    }

    // ---------------------------------------------------------------------
    // Accessors

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    pub fn phase(&self) -> BackendPhase {
        *lock_unpoisoned(&self.phase)
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::Acquire)
    }

    /// Whether the device has flagged itself unusable
    pub fn is_invalid(&self) -> bool {
        self.status.is_invalid()
    }

    /// Handle the device uses to report an invalid state
    pub fn device_status(&self) -> DeviceStatus {
        self.status.clone()
    }

    pub fn fifo(&self) -> &CommandFifo {
        &self.fifo
    }

    pub fn memory(&self) -> &Arc<dyn GuestMemory> {
        &self.memory
    }

    pub fn interrupts(&self) -> &Arc<InterruptController> {
        &self.interrupts
    }

    pub fn config(&self) -> &VideoConfig {
        &self.config
    }

    pub fn budget(&self) -> &SyncBudget {
        &self.budget
    }

    /// Run `f` against the GPU state between two commands
    pub fn with_gpu<R>(&self, f: impl FnOnce(&GpuState) -> R) -> R {
        f(&lock_unpoisoned(&self.gpu))
    }

    /// Field bookkeeping snapshot
    pub fn field_snapshot(&self) -> FieldSnapshot {
        lock_unpoisoned(&self.fields).snapshot()
    }

    pub fn frames_presented(&self) -> u64 {
        self.frames_presented.load(Ordering::Acquire)
    }

    pub fn perf_select(&self) -> u16 {
        self.perf_select.load(Ordering::Acquire)
    }

    pub(crate) fn set_perf_select(&self, value: u16) {
        self.perf_select.store(value, Ordering::Release);
    }

    fn is_render_thread(&self) -> bool {
        *lock_unpoisoned(&self.render_thread) == Some(thread::current().id())
    }

    fn set_phase(&self, phase: BackendPhase) {
        let mut current = lock_unpoisoned(&self.phase);
        log::debug!("{}: {:?} -> {:?}", self.name, *current, phase);
        *current = phase;
    }

    /// Move to `to` only if currently in `from`
    fn transition_phase(&self, from: BackendPhase, to: BackendPhase) {
        let mut current = lock_unpoisoned(&self.phase);
        if *current == from {
            log::debug!("{}: {:?} -> {:?}", self.name, from, to);
            *current = to;
        }
    }

    fn expect_initialized(&self, operation: &'static str) -> Result<()> {
        if self.is_initialized() {
            Ok(())
        } else {
            Err(violation(UsageViolation::InvalidPhase {
                operation,
                phase: self.phase(),
            }))
        }
    }

    fn expect_phase(&self, operation: &'static str, expected: &[BackendPhase]) -> Result<()> {
        let phase = self.phase();
        if expected.contains(&phase) {
            Ok(())
        } else {
            Err(violation(UsageViolation::InvalidPhase { operation, phase }))
        }
    }

    // ---------------------------------------------------------------------
    // Lifecycle

    /// Bring the device up and zero all emulated state
    pub fn initialize(&self, window: WindowHandle) -> Result<()> {
        self.expect_phase("initialize", &[BackendPhase::Uninitialized])?;

        self.status.clear();
        {
            let mut device = lock_unpoisoned(&self.device);
            if let Err(e) = device.initialize(window, self.status.clone()) {
                log::error!("Failed to initialize video backend '{}': {}", self.name, e);
                return Err(match e {
                    VideoError::InitializationFailure { .. } => e,
                    other => VideoError::InitializationFailure {
                        backend: self.name.clone(),
                        reason: other.to_string(),
                    },
                });
            }
        }

        self.fifo.reset();
        lock_unpoisoned(&self.gpu).reset();
        lock_unpoisoned(&self.fields).reset();
        lock_unpoisoned(&self.osd).clear();
        lock_unpoisoned(&self.control).reset();
        self.fifo.gate().open();
        self.budget.reset();
        self.pause_flag.store(false, Ordering::Release);
        self.rendering_enabled.store(true, Ordering::Release);
        self.frames_presented.store(0, Ordering::Release);
        self.perf_select.store(0, Ordering::Release);
        self.determinism_dirty.store(true, Ordering::Release);

        self.initialized.store(true, Ordering::Release);
        self.set_phase(BackendPhase::Initialized);
        log::info!("Video backend '{}' initialized", self.display_name);
        Ok(())
    }

    /// Bind the calling thread as the rendering thread
    pub fn prepare(&self) -> Result<()> {
        self.expect_phase("prepare", &[BackendPhase::Initialized])?;
        lock_unpoisoned(&self.device).prepare()?;
        *lock_unpoisoned(&self.render_thread) = Some(thread::current().id());
        self.set_phase(BackendPhase::Preparing);
        Ok(())
    }

    /// Release per-thread device resources; must run on the rendering thread
    ///
    /// Does nothing if the backend was shut down underneath the loop.
    pub fn cleanup(&self) -> Result<()> {
        {
            let mut phase = lock_unpoisoned(&self.phase);
            match *phase {
                BackendPhase::Preparing => {}
                BackendPhase::Shutdown | BackendPhase::Uninitialized => {
                    log::debug!("{}: cleanup after shutdown ignored", self.name);
                    return Ok(());
                }
                other => {
                    return Err(violation(UsageViolation::InvalidPhase {
                        operation: "cleanup",
                        phase: other,
                    }))
                }
            }
            if !self.is_render_thread() {
                return Err(violation(UsageViolation::WrongThread {
                    operation: "cleanup",
                }));
            }
            log::debug!("{}: {:?} -> {:?}", self.name, *phase, BackendPhase::CleaningUp);
            *phase = BackendPhase::CleaningUp;
        }

        lock_unpoisoned(&self.device).cleanup();
        *lock_unpoisoned(&self.render_thread) = None;
        self.transition_phase(BackendPhase::CleaningUp, BackendPhase::Initialized);
        Ok(())
    }

    /// Tear the backend down
    ///
    /// A running loop is asked to exit and waited for first. Calling this from
    /// the rendering thread while its loop runs is refused. A second call is a
    /// no-op.
    pub fn shutdown(&self) -> Result<()> {
        if !self.is_initialized() {
            log::info!("Video backend '{}' already shut down", self.name);
            return Ok(());
        }

        {
            let mut ctl = lock_unpoisoned(&self.control);
            if ctl.loop_active {
                if self.is_render_thread() {
                    return Err(violation(UsageViolation::InvalidPhase {
                        operation: "shutdown from the rendering thread",
                        phase: self.phase(),
                    }));
                }
                log::info!("Waiting for the rendering thread to leave its loop");
                ctl.exit_requested = true;
                self.wakeup.notify_all();
                while ctl.loop_active {
                    ctl = wait_unpoisoned(&self.wakeup, ctl);
                }
            }
            ctl.reset();
            self.fifo.gate().open();
            self.wakeup.notify_all();
        }

        self.set_phase(BackendPhase::Shutdown);
        lock_unpoisoned(&self.device).shutdown();
        self.pause_flag.store(false, Ordering::Release);
        *lock_unpoisoned(&self.render_thread) = None;
        self.initialized.store(false, Ordering::Release);
        self.set_phase(BackendPhase::Uninitialized);
        log::info!("Video backend '{}' shut down", self.display_name);
        Ok(())
    }

    /// Shut down and report an error if the device went invalid
    pub fn check_invalid_state(&self) -> Result<()> {
        if !self.status.is_invalid() {
            return Ok(());
        }
        log::error!(
            "Video backend '{}' is in an invalid state, shutting down",
            self.name
        );
        self.shutdown()?;
        Err(VideoError::InvalidDeviceState(self.name.clone()))
    }

    /// Request deterministic output
    ///
    /// The device is told at the next rendering-thread checkpoint. While set,
    /// `sync` waits for the FIFO to drain completely.
    pub fn update_want_determinism(&self, want: bool) {
        if self.want_determinism.swap(want, Ordering::AcqRel) != want {
            self.determinism_dirty.store(true, Ordering::Release);
            let _ctl = lock_unpoisoned(&self.control);
            self.wakeup.notify_all();
        }
    }

    pub fn want_determinism(&self) -> bool {
        self.want_determinism.load(Ordering::Acquire)
    }

    /// Enable or skip presentation of completed fields
    pub fn set_rendering(&self, enabled: bool) {
        self.rendering_enabled.store(enabled, Ordering::Release);
    }

    /// Drain host window events through the device
    pub fn peek_messages(&self) {
        lock_unpoisoned(&self.device).peek_messages();
    }

    pub fn add_message(&self, text: impl Into<String>, milliseconds: u32) {
        lock_unpoisoned(&self.osd).add(text, milliseconds);
    }

    pub fn clear_messages(&self) {
        lock_unpoisoned(&self.osd).clear();
    }

    // ---------------------------------------------------------------------
    // Rendering thread

    /// Run the GPU loop on the calling (rendering) thread
    ///
    /// Returns after [`exit_loop`](Self::exit_loop), shutdown, or when the
    /// device flags an invalid state.
    pub fn enter_loop(&self) -> Result<()> {
        self.expect_phase("enter_loop", &[BackendPhase::Preparing])?;
        if !self.is_render_thread() {
            return Err(violation(UsageViolation::WrongThread {
                operation: "enter_loop",
            }));
        }

        {
            let mut ctl = lock_unpoisoned(&self.control);
            ctl.loop_active = true;
            ctl.exit_requested = false;
            ctl.parked = false;
            self.set_phase(if ctl.hold {
                BackendPhase::Paused
            } else {
                BackendPhase::Running
            });
        }
        log::info!("GPU loop started on {:?}", thread::current().id());

        while let Some(presents) = self.wait_for_work() {
            self.checkpoint();
            for field in presents {
                self.present(field);
            }
            self.run_gpu();
        }

        {
            let mut ctl = lock_unpoisoned(&self.control);
            ctl.loop_active = false;
            ctl.parked = false;
            ctl.exit_requested = false;
            self.fifo.update_safe_read_pointer();
            // Before waking a waiting shutdown, so it has the last word on the phase
            self.set_phase(BackendPhase::Preparing);
            self.wakeup.notify_all();
        }

        if self.status.is_invalid() {
            log::error!("GPU loop stopped: device '{}' is invalid", self.name);
        } else {
            log::info!("GPU loop stopped");
        }
        Ok(())
    }

    /// Rendering-thread housekeeping between batches
    fn checkpoint(&self) {
        if self.determinism_dirty.swap(false, Ordering::AcqRel) {
            let want = self.want_determinism.load(Ordering::Acquire);
            lock_unpoisoned(&self.device).set_want_determinism(want);
            log::debug!("Device determinism set to {}", want);
        }
        self.peek_messages();
    }

    fn present(&self, field: FieldRect) {
        if !self.rendering_enabled.load(Ordering::Acquire) {
            log::trace!("Skipping presentation of {:?}", field);
            return;
        }
        let messages = lock_unpoisoned(&self.osd).visible(Instant::now());
        let gpu = lock_unpoisoned(&self.gpu);
        let frame = Frame {
            field,
            efb: gpu.efb(),
            messages: &messages,
        };
        lock_unpoisoned(&self.device).present(&frame);
        self.frames_presented.fetch_add(1, Ordering::AcqRel);
    }

    /// Execute whole commands until the FIFO runs dry or a pause is requested
    ///
    /// Returns the number of commands executed.
    pub(crate) fn run_gpu(&self) -> u64 {
        let per_checkpoint = u64::from(self.config.commands_per_checkpoint.max(1));
        let cycles_per_byte = self.config.gpu_cycles_per_byte;
        let ctx = ExecContext {
            fifo: &self.fifo,
            interrupts: &self.interrupts,
        };
        let mut header = [0u8; MAX_HEADER_LEN];
        let mut body = Vec::new();
        let mut executed = 0u64;

        loop {
            if self.pause_flag.load(Ordering::Acquire) {
                break;
            }
            if self.config.sync_gpu && !self.budget.has_budget() {
                break;
            }
            if self.fifo.check_breakpoint() || !self.fifo.can_read() {
                break;
            }

            let distance = self.fifo.read_write_distance() as usize;
            let read_pointer = self.fifo.read_pointer();
            let peek = &mut header[..distance.min(MAX_HEADER_LEN)];
            if let Err(e) = self.fifo.read_ring(self.memory.as_ref(), read_pointer, peek) {
                self.discard_unreadable(e);
                break;
            }
            let Some(len) = opcodes::command_length(peek) else {
                break;
            };
            if len > distance {
                // Wait for the rest of the command
                break;
            }

            body.resize(len, 0);
            if let Err(e) = self.fifo.read_ring(self.memory.as_ref(), read_pointer, &mut body) {
                self.discard_unreadable(e);
                break;
            }
            let Some((command, _)) = opcodes::decode(&body) else {
                break;
            };

            lock_unpoisoned(&self.gpu).execute(&command, &ctx);
            self.fifo.advance_read_pointer(len as u32);
            self.budget.spend(len as i64 * cycles_per_byte);
            executed += 1;

            if executed % per_checkpoint == 0 {
                self.fifo.update_safe_read_pointer();
                self.wakeup.notify_all();
            }
        }

        self.fifo.update_safe_read_pointer();
        if !self.fifo.can_read() {
            self.budget.reset();
        }
        if executed > 0 {
            log::trace!("GPU executed {} commands", executed);
        }
        executed
    }

    fn discard_unreadable(&self, error: VideoError) {
        log::error!(
            "GPU cannot read FIFO at 0x{:08X}: {}; dropping pending data",
            self.fifo.read_pointer(),
            error
        );
        self.fifo.store_read_pointer(self.fifo.write_pointer());
    }

    // ---------------------------------------------------------------------
    // Gateway operations

    /// CPU access to the EFB
    ///
    /// Out-of-range coordinates return [`crate::core::gpu::EFB_ACCESS_SENTINEL`].
    /// Pokes from a thread other than the pause lock owner wait for the unlock.
    pub fn access_efb(&self, kind: EfbAccessType, x: u32, y: u32, data: u32) -> u32 {
        if kind.is_poke() {
            let _gate = self.fifo.gate().enter();
            lock_unpoisoned(&self.gpu).access_efb(kind, x, y, data)
        } else {
            lock_unpoisoned(&self.gpu).access_efb(kind, x, y, data)
        }
    }

    /// Read a pixel engine performance counter
    pub fn get_query_result(&self, query: PerfQueryType) -> u32 {
        lock_unpoisoned(&self.gpu).query_result(query)
    }

    /// Read one bounding box edge (0 left, 1 right, 2 top, 3 bottom)
    pub fn get_bounding_box(&self, index: usize) -> Result<u16> {
        lock_unpoisoned(&self.gpu).bounding_box(index)
    }

    // ---------------------------------------------------------------------
    // Savestates

    fn expect_quiesced(&self, operation: &'static str) -> Result<()> {
        let ctl = lock_unpoisoned(&self.control);
        if ctl.lock_owner == Some(thread::current().id()) || !ctl.loop_active {
            Ok(())
        } else {
            Err(violation(UsageViolation::NotQuiesced { operation }))
        }
    }

    /// Capture FIFO, field and bounding box state
    ///
    /// The caller must hold the pause lock, or no loop may be running.
    pub fn save_state(&self) -> Result<VideoState> {
        self.expect_quiesced("save_state")?;
        let field = lock_unpoisoned(&self.fields).snapshot();
        let bbox = lock_unpoisoned(&self.gpu).bounding_box_all();
        Ok(VideoState::new(
            self.name.clone(),
            self.fifo.snapshot(),
            field,
            bbox,
        ))
    }

    /// Restore state captured by [`save_state`](Self::save_state)
    pub fn load_state(&self, state: &VideoState) -> Result<()> {
        self.expect_quiesced("load_state")?;
        {
            let _gate = self.fifo.gate().enter();
            self.fifo.store_state(&state.fifo);
            lock_unpoisoned(&self.fields).restore(&state.field);
            lock_unpoisoned(&self.gpu).set_bounding_box(state.bounding_box);
        }
        self.budget.reset();
        log::info!(
            "Loaded video state from {} (read 0x{:08X}, write 0x{:08X})",
            state.metadata.timestamp,
            state.fifo.read_pointer,
            state.fifo.write_pointer
        );
        Ok(())
    }
}
