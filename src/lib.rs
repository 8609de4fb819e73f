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

//! GameCube/Wii video backend core library
//!
//! This library models the console's graphics command pipeline: the command
//! processor FIFO the CPU streams into, the rendering thread that drains it,
//! and the synchronization that lets debuggers, savestates and UIs freeze the
//! GPU at a command boundary.
//!
//! # Example
//!
//! ```
//! use gxvideo::core::backend::{BackendRegistry, VideoContext, WindowHandle};
//! use gxvideo::core::config::VideoConfig;
//! use gxvideo::core::interrupt::InterruptController;
//! use gxvideo::core::memory::MainRam;
//! use std::sync::Arc;
//!
//! let context = VideoContext::new(
//!     Arc::new(MainRam::new(0x10000)),
//!     Arc::new(InterruptController::new()),
//!     VideoConfig::default(),
//! );
//! let mut registry = BackendRegistry::new(context);
//! registry.populate_list();
//!
//! let backend = registry.activate_backend("Software Renderer").unwrap();
//! backend.initialize(WindowHandle::HEADLESS).unwrap();
//! assert!(backend.is_initialized());
//! backend.shutdown().unwrap();
//! ```

pub mod core;
