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

//! Render device interface
//!
//! A device is the host-API half of a backend: it owns the window/surface and
//! turns completed fields into pixels on screen. Every method except
//! `initialize` and `shutdown` is called on the rendering thread.

use super::field::FieldRect;
use crate::core::error::Result;
use crate::core::gpu::{Efb, EfbRect};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Opaque host window handle (0 = headless)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WindowHandle(pub usize);

impl WindowHandle {
    pub const HEADLESS: WindowHandle = WindowHandle(0);
}

/// Flag a device sets when it can no longer render
///
/// The backend polls it; it is never raised across threads as an error.
#[derive(Debug, Clone, Default)]
pub struct DeviceStatus(Arc<AtomicBool>);

impl DeviceStatus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Report an unrecoverable device error
    pub fn mark_invalid(&self) {
        if !self.0.swap(true, Ordering::AcqRel) {
            log::error!("Render device reported an invalid state");
        }
    }

    pub fn is_invalid(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    pub fn clear(&self) {
        self.0.store(false, Ordering::Release);
    }
}

/// A completed field ready for presentation
pub struct Frame<'a> {
    pub field: FieldRect,
    pub efb: &'a Efb,
    pub messages: &'a [String],
}

impl Frame<'_> {
    /// Source rectangle of the field in EFB pixels
    pub fn source(&self) -> EfbRect {
        EfbRect {
            x: self.field.x,
            y: self.field.y,
            width: self.field.width,
            height: self.field.height,
        }
    }
}

/// Host rendering device
pub trait RenderDevice: Send {
    /// Short unique name used for selection
    fn name(&self) -> &str;

    /// Human-readable name
    fn display_name(&self) -> &str {
        self.name()
    }

    fn initialize(&mut self, window: WindowHandle, status: DeviceStatus) -> Result<()>;

    fn shutdown(&mut self);

    fn prepare(&mut self) -> Result<()> {
        Ok(())
    }

    fn cleanup(&mut self) {}

    /// Drain pending host window events without blocking
    fn peek_messages(&mut self) {}

    fn present(&mut self, frame: &Frame<'_>);

    fn set_want_determinism(&mut self, _want: bool) {}
}

/// Device that renders nothing
#[derive(Debug, Default)]
pub struct NullDevice;

impl RenderDevice for NullDevice {
    fn name(&self) -> &str {
        "Null"
    }

    fn initialize(&mut self, _window: WindowHandle, _status: DeviceStatus) -> Result<()> {
        Ok(())
    }

    fn shutdown(&mut self) {}

    fn present(&mut self, _frame: &Frame<'_>) {}
}

/// CPU-side device that scans the EFB out into an RGBA8 buffer
#[derive(Debug, Default)]
pub struct SoftwareDevice {
    framebuffer: Vec<u8>,
    width: u32,
    height: u32,
    deterministic: bool,
}

impl SoftwareDevice {
    pub fn new() -> Self {
        Self::default()
    }

    /// Last presented frame as RGBA8
    pub fn framebuffer(&self) -> &[u8] {
        &self.framebuffer
    }

    /// Size of the last presented frame
    pub fn frame_size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Whether the host asked for deterministic output
    pub fn is_deterministic(&self) -> bool {
        self.deterministic
    }
}

impl RenderDevice for SoftwareDevice {
    fn name(&self) -> &str {
        "Software Renderer"
    }

    fn initialize(&mut self, window: WindowHandle, _status: DeviceStatus) -> Result<()> {
        log::debug!("Software renderer attached to window {:?}", window);
        Ok(())
    }

    fn shutdown(&mut self) {
        self.framebuffer = Vec::new();
        self.width = 0;
        self.height = 0;
    }

    fn present(&mut self, frame: &Frame<'_>) {
        let source = frame.source();
        self.framebuffer = frame.efb.scanout_rgba8(source);
        self.width = source.width.min(frame.efb.width().saturating_sub(source.x));
        self.height = source.height.min(frame.efb.height().saturating_sub(source.y));
        for message in frame.messages {
            log::debug!("OSD [{}x{}]: {}", self.width, self.height, message);
        }
    }

    fn set_want_determinism(&mut self, want: bool) {
        self.deterministic = want;
    }
}
