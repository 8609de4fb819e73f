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

//! Video core components
//!
//! This module contains the GameCube/Wii video pipeline model:
//! - Command processor FIFO (register model and ring bookkeeping)
//! - Video backend (lifecycle, pause/lock, field sync, gateway operations)
//! - GPU state (EFB, bounding box, performance counters, command execution)
//! - Gather pipe (CPU-side burst producer)
//! - Guest memory and MMIO registration
//! - Processor interface interrupts
//! - Savestates and configuration

pub mod backend;
pub mod config;
pub mod error;
pub mod fifo;
pub mod float_utils;
pub mod gather_pipe;
pub mod gpu;
pub mod interrupt;
pub mod memory;
pub mod osd;
pub mod save_state;
pub mod timing;

// Re-export commonly used types
pub use backend::{BackendPhase, BackendRegistry, VideoBackend, VideoContext};
pub use config::VideoConfig;
pub use error::{Result, UsageViolation, VideoError};
pub use fifo::CommandFifo;
pub use gather_pipe::GatherPipe;
pub use gpu::GpuState;
pub use interrupt::InterruptController;
pub use memory::{GuestMemory, MainRam};

use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};

/// Lock a mutex, recovering the data if another thread panicked while holding it
#[inline]
pub(crate) fn lock_unpoisoned<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Wait on a condition variable, ignoring poisoning
#[inline]
pub(crate) fn wait_unpoisoned<'a, T>(
    condvar: &Condvar,
    guard: MutexGuard<'a, T>,
) -> MutexGuard<'a, T> {
    condvar.wait(guard).unwrap_or_else(PoisonError::into_inner)
}
