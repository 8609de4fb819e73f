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

//! Backend registry
//!
//! Owns every available backend and tracks which one is active. There is no
//! process-wide registry; the host creates one and passes it around.

use super::device::{NullDevice, RenderDevice, SoftwareDevice};
use super::VideoBackend;
use crate::core::config::VideoConfig;
use crate::core::error::{Result, VideoError};
use crate::core::interrupt::InterruptController;
use crate::core::memory::GuestMemory;
use std::sync::Arc;

/// Collaborators every backend is built against
#[derive(Clone)]
pub struct VideoContext {
    pub memory: Arc<dyn GuestMemory>,
    pub interrupts: Arc<InterruptController>,
    pub config: VideoConfig,
}

impl VideoContext {
    pub fn new(
        memory: Arc<dyn GuestMemory>,
        interrupts: Arc<InterruptController>,
        config: VideoConfig,
    ) -> Self {
        Self {
            memory,
            interrupts,
            config,
        }
    }
}

/// Available backends plus the active selection
pub struct BackendRegistry {
    context: VideoContext,
    backends: Vec<Arc<VideoBackend>>,
    active: Option<usize>,
}

impl BackendRegistry {
    pub fn new(context: VideoContext) -> Self {
        Self {
            context,
            backends: Vec::new(),
            active: None,
        }
    }

    /// Register the built-in backends; the first becomes active
    pub fn populate_list(&mut self) {
        self.register(Box::new(NullDevice));
        self.register(Box::new(SoftwareDevice::new()));
        if !self.backends.is_empty() {
            self.active = Some(0);
        }
    }

    /// Add a backend for `device`
    ///
    /// It becomes active only if nothing else is.
    pub fn register(&mut self, device: Box<dyn RenderDevice>) -> Arc<VideoBackend> {
        let backend = Arc::new(VideoBackend::new(device, &self.context));
        log::debug!("Registered video backend '{}'", backend.name());
        self.backends.push(Arc::clone(&backend));
        if self.active.is_none() {
            self.active = Some(self.backends.len() - 1);
        }
        backend
    }

    /// Drop every backend, shutting the active one down first
    pub fn clear_list(&mut self) -> Result<()> {
        if let Some(active) = self.active() {
            if active.is_initialized() {
                active.shutdown()?;
            }
        }
        self.backends.clear();
        self.active = None;
        Ok(())
    }

    /// Select a backend by exact, case-sensitive name
    ///
    /// Switching away from an initialized backend shuts it down first. An
    /// unknown name leaves the selection unchanged.
    pub fn activate_backend(&mut self, name: &str) -> Result<Arc<VideoBackend>> {
        let Some(index) = self.backends.iter().position(|b| b.name() == name) else {
            log::warn!("Video backend '{}' not found", name);
            return Err(VideoError::NotFound {
                name: name.to_string(),
            });
        };

        if self.active != Some(index) {
            if let Some(previous) = self.active() {
                if previous.is_initialized() {
                    previous.shutdown()?;
                }
            }
            self.active = Some(index);
            log::info!("Activated video backend '{}'", name);
        }

        Ok(Arc::clone(&self.backends[index]))
    }

    pub fn active(&self) -> Option<Arc<VideoBackend>> {
        self.active.map(|i| Arc::clone(&self.backends[i]))
    }

    pub fn get(&self, name: &str) -> Option<Arc<VideoBackend>> {
        self.backends.iter().find(|b| b.name() == name).cloned()
    }

    /// Names in registration order
    pub fn names(&self) -> Vec<String> {
        self.backends.iter().map(|b| b.name().to_string()).collect()
    }

    pub fn len(&self) -> usize {
        self.backends.len()
    }

    pub fn is_empty(&self) -> bool {
        self.backends.is_empty()
    }
}
