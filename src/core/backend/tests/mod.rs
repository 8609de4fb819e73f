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

//! Video backend tests
//!
//! - `lifecycle`: phase transitions, initialization failure, shutdown
//! - `pause_lock`: lock balance and isolation
//! - `fields`: field pairing and presentation
//! - `gateway`: EFB, perf query and bounding box access
//! - `mmio`: CP register handlers
//! - `registry`: backend selection
//! - `savestate`: save/load quiescence and round trip
//! - `pacing`: sync budget and single-core execution

mod fields;
mod registry;

use super::*;
use crate::core::fifo::registers::CpControl;
use crate::core::gather_pipe::GatherPipe;
use crate::core::gpu::GxCommand;
use crate::core::memory::MainRam;
use std::thread::JoinHandle;
use std::time::Duration;

pub(super) const RING_BASE: u32 = 0x1000;
pub(super) const RING_END: u32 = 0x9000;

pub(super) type DeviceLog = Arc<Mutex<Vec<String>>>;

/// Device that records every call
pub(super) struct RecordingDevice {
    name: &'static str,
    log: DeviceLog,
    fail_init: bool,
}

impl RecordingDevice {
    pub(super) fn new(name: &'static str) -> (Self, DeviceLog) {
        let log = DeviceLog::default();
        (
            Self {
                name,
                log: Arc::clone(&log),
                fail_init: false,
            },
            log,
        )
    }

    pub(super) fn failing(name: &'static str) -> (Self, DeviceLog) {
        let (mut device, log) = Self::new(name);
        device.fail_init = true;
        (device, log)
    }

    fn record(&self, entry: String) {
        lock_unpoisoned(&self.log).push(entry);
    }
}

impl RenderDevice for RecordingDevice {
    fn name(&self) -> &str {
        self.name
    }

    fn initialize(&mut self, _window: WindowHandle, _status: DeviceStatus) -> Result<()> {
        if self.fail_init {
            return Err(VideoError::InvalidArgument("no adapter".to_string()));
        }
        self.record("initialize".to_string());
        Ok(())
    }

    fn shutdown(&mut self) {
        self.record("shutdown".to_string());
    }

    fn prepare(&mut self) -> Result<()> {
        self.record("prepare".to_string());
        Ok(())
    }

    fn cleanup(&mut self) {
        self.record("cleanup".to_string());
    }

    fn present(&mut self, frame: &Frame<'_>) {
        self.record(format!("present {:?}", frame.field.parity));
        for message in frame.messages {
            self.record(format!("message {}", message));
        }
    }

    fn set_want_determinism(&mut self, want: bool) {
        self.record(format!("determinism {}", want));
    }
}

pub(super) fn count(log: &DeviceLog, entry: &str) -> usize {
    lock_unpoisoned(log).iter().filter(|e| *e == entry).count()
}

pub(super) fn context_with(config: VideoConfig) -> VideoContext {
    VideoContext::new(
        Arc::new(MainRam::new(0x10000)),
        Arc::new(InterruptController::new()),
        config,
    )
}

pub(super) fn context() -> VideoContext {
    context_with(VideoConfig::default())
}

/// Initialized backend around a recording device, with the ring configured
pub(super) fn recording_backend_with(config: VideoConfig) -> (Arc<VideoBackend>, DeviceLog) {
    let (device, log) = RecordingDevice::new("Recorder");
    let backend = Arc::new(VideoBackend::new(Box::new(device), &context_with(config)));
    backend.initialize(WindowHandle::HEADLESS).unwrap();
    backend.fifo().init_ring(RING_BASE, RING_END);
    backend
        .fifo()
        .set_control(CpControl::READ_ENABLE | CpControl::LINK_ENABLE);
    (backend, log)
}

pub(super) fn recording_backend() -> (Arc<VideoBackend>, DeviceLog) {
    recording_backend_with(VideoConfig::default())
}

/// Run prepare/enter_loop/cleanup on a new thread and wait for the loop to start
pub(super) fn start_loop(backend: &Arc<VideoBackend>) -> JoinHandle<Result<()>> {
    let b = Arc::clone(backend);
    let handle = std::thread::spawn(move || {
        b.prepare()?;
        let result = b.enter_loop();
        if b.phase() == BackendPhase::Preparing {
            b.cleanup()?;
        }
        result
    });
    assert!(wait_until(|| matches!(
        backend.phase(),
        BackendPhase::Running | BackendPhase::Paused
    )));
    handle
}

pub(super) fn stop_loop(backend: &Arc<VideoBackend>, handle: JoinHandle<Result<()>>) {
    backend.exit_loop();
    handle.join().unwrap().unwrap();
}

/// Poll `condition` for up to five seconds
pub(super) fn wait_until(mut condition: impl FnMut() -> bool) -> bool {
    for _ in 0..500 {
        if condition() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(10));
    }
    condition()
}

/// Write commands through a gather pipe and flush the last burst
pub(super) fn write_commands(backend: &Arc<VideoBackend>, commands: &[GxCommand]) {
    let mut pipe = GatherPipe::new(Arc::clone(backend));
    for command in commands {
        pipe.write_command(command).unwrap();
    }
    pipe.pad_and_flush().unwrap();
}

pub(super) fn bp(register: u8, value: u32) -> GxCommand {
    GxCommand::LoadBpReg { register, value }
}

pub(super) fn commands_executed(backend: &VideoBackend) -> u64 {
    backend.with_gpu(|gpu| gpu.commands_executed())
}
