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

/// Video core error types
use thiserror::Error;

use super::backend::BackendPhase;

/// Result type for video core operations
pub type Result<T> = std::result::Result<T, VideoError>;

/// Main error type for the video core
#[derive(Error, Debug)]
pub enum VideoError {
    #[error("Failed to initialize video backend '{backend}': {reason}")]
    InitializationFailure { backend: String, reason: String },

    #[error("Video backend '{0}' reported an unrecoverable device error")]
    InvalidDeviceState(String),

    #[error("Usage violation: {0}")]
    Usage(#[from] UsageViolation),

    #[error("Video backend not found: {name}")]
    NotFound { name: String },

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Invalid guest memory access at 0x{address:08X} ({len} bytes)")]
    InvalidMemoryAccess { address: u32, len: usize },

    #[error("Save state error: {0}")]
    SaveState(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Local programming errors
///
/// These are logged at error level where they are detected and returned to the
/// caller; none of them leaves shared state modified.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum UsageViolation {
    #[error("pause lock requested again by the thread that already holds it")]
    PauseLockReentered,

    #[error("pause lock released without a matching lock from this thread")]
    UnbalancedPauseLock,

    #[error("begin_field called while a field is still open")]
    FieldAlreadyOpen,

    #[error("end_field called without an open field")]
    NoOpenField,

    #[error("{operation} is not valid in phase {phase:?}")]
    InvalidPhase {
        operation: &'static str,
        phase: BackendPhase,
    },

    #[error("{operation} must run on the rendering thread")]
    WrongThread { operation: &'static str },

    #[error("{operation} requires the backend to be paused and locked")]
    NotQuiesced { operation: &'static str },
}
