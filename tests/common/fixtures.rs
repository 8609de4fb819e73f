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

//! Test fixtures for common session setups

use gxvideo::core::backend::{VideoBackend, VideoContext, WindowHandle};
use gxvideo::core::config::VideoConfig;
use gxvideo::core::error::Result;
use gxvideo::core::fifo::registers::CpControl;
use gxvideo::core::fifo::CommandFifo;
use gxvideo::core::interrupt::{interrupts, InterruptController};
use gxvideo::core::memory::MainRam;
use gxvideo::core::{BackendPhase, BackendRegistry};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

/// Ring used by most tests
pub const RING_BASE: u32 = 0x0001_0000;
pub const RING_END: u32 = 0x0001_2000;

/// Guest RAM size for tests
pub const RAM_SIZE: usize = 0x0004_0000;

/// Context with small RAM and every video interrupt unmasked
#[allow(dead_code)]
pub fn create_context(config: VideoConfig) -> VideoContext {
    let interrupts = Arc::new(InterruptController::new());
    interrupts.write_mask(interrupts::CP | interrupts::PE_TOKEN | interrupts::PE_FINISH);
    VideoContext::new(Arc::new(MainRam::new(RAM_SIZE)), interrupts, config)
}

/// Initialized backend from a populated registry, FIFO linked and reading
#[allow(dead_code)]
pub fn create_backend(name: &str, config: VideoConfig) -> Arc<VideoBackend> {
    let mut registry = BackendRegistry::new(create_context(config));
    registry.populate_list();
    let backend = registry
        .activate_backend(name)
        .expect("built-in backend missing");
    backend
        .initialize(WindowHandle::HEADLESS)
        .expect("Failed to initialize backend");
    backend.fifo().init_ring(RING_BASE, RING_END);
    backend
        .fifo()
        .set_control(CpControl::READ_ENABLE | CpControl::LINK_ENABLE);
    backend
}

/// Run the rendering thread's side of a session and wait until it loops
#[allow(dead_code)]
pub fn spawn_render_thread(backend: &Arc<VideoBackend>) -> JoinHandle<Result<()>> {
    let b = Arc::clone(backend);
    let handle = std::thread::spawn(move || {
        b.prepare()?;
        let result = b.enter_loop();
        b.cleanup()?;
        result
    });
    assert!(
        wait_until(|| matches!(
            backend.phase(),
            BackendPhase::Running | BackendPhase::Paused
        )),
        "rendering thread never entered its loop"
    );
    handle
}

/// Poll `condition` for up to ten seconds
#[allow(dead_code)]
pub fn wait_until(mut condition: impl FnMut() -> bool) -> bool {
    for _ in 0..1000 {
        if condition() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(10));
    }
    condition()
}

/// Bytes the CPU has written that the GPU has not consumed, published or not
#[allow(dead_code)]
pub fn backlog(fifo: &CommandFifo) -> u32 {
    let size = i64::from(fifo.size());
    let pending = i64::from(fifo.cpu_write_pointer()) - i64::from(fifo.read_pointer());
    pending.rem_euclid(size) as u32
}
