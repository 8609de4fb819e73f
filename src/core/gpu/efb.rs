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

//! Embedded framebuffer (EFB)
//!
//! The EFB is the GPU's on-chip render target. Color is kept as `0xAARRGGBB`
//! and depth as a 24-bit unsigned value in the low bits of a `u32`.

/// Value returned by EFB accesses that fall outside the framebuffer
pub const EFB_ACCESS_SENTINEL: u32 = 0;

/// Mask applied to depth values
pub const DEPTH_MASK: u32 = 0x00FF_FFFF;

/// Kind of CPU access to the EFB
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EfbAccessType {
    PeekZ,
    PokeZ,
    PeekColor,
    PokeColor,
}

impl EfbAccessType {
    /// Whether the access writes the EFB
    pub fn is_poke(self) -> bool {
        matches!(self, EfbAccessType::PokeZ | EfbAccessType::PokeColor)
    }
}

/// Rectangle in EFB pixels
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EfbRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl EfbRect {
    /// Number of pixels covered
    pub fn area(&self) -> u64 {
        u64::from(self.width) * u64::from(self.height)
    }
}

/// Color and depth planes
#[derive(Debug, Clone)]
pub struct Efb {
    width: u32,
    height: u32,
    color: Vec<u32>,
    depth: Vec<u32>,
}

impl Efb {
    /// Retail EFB width
    pub const DEFAULT_WIDTH: u32 = 640;

    /// Retail EFB height
    pub const DEFAULT_HEIGHT: u32 = 528;

    /// Create a cleared framebuffer
    pub fn new(width: u32, height: u32) -> Self {
        let pixels = width as usize * height as usize;
        Self {
            width,
            height,
            color: vec![0; pixels],
            depth: vec![0; pixels],
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    #[inline(always)]
    fn index(&self, x: u32, y: u32) -> Option<usize> {
        (x < self.width && y < self.height).then(|| (y * self.width + x) as usize)
    }

    /// Perform a CPU access
    ///
    /// Peeks return the stored value; pokes store `data` and return the value
    /// they replaced. Out-of-range coordinates return [`EFB_ACCESS_SENTINEL`]
    /// and leave the framebuffer untouched.
    pub fn access(&mut self, kind: EfbAccessType, x: u32, y: u32, data: u32) -> u32 {
        let Some(index) = self.index(x, y) else {
            log::warn!(
                "EFB {:?} outside {}x{} framebuffer: ({}, {})",
                kind,
                self.width,
                self.height,
                x,
                y
            );
            return EFB_ACCESS_SENTINEL;
        };

        match kind {
            EfbAccessType::PeekColor => self.color[index],
            EfbAccessType::PeekZ => self.depth[index],
            EfbAccessType::PokeColor => std::mem::replace(&mut self.color[index], data),
            EfbAccessType::PokeZ => std::mem::replace(&mut self.depth[index], data & DEPTH_MASK),
        }
    }

    /// Fill a rectangle, clipped to the framebuffer
    ///
    /// Returns the clipped rectangle, or `None` if nothing was covered.
    pub fn clear_rect(&mut self, rect: EfbRect, color: u32, depth: u32) -> Option<EfbRect> {
        let x0 = rect.x.min(self.width);
        let y0 = rect.y.min(self.height);
        let x1 = rect.x.saturating_add(rect.width).min(self.width);
        let y1 = rect.y.saturating_add(rect.height).min(self.height);
        if x0 >= x1 || y0 >= y1 {
            return None;
        }

        let depth = depth & DEPTH_MASK;
        for y in y0..y1 {
            let row = (y * self.width) as usize;
            let span = row + x0 as usize..row + x1 as usize;
            self.color[span.clone()].fill(color);
            self.depth[span].fill(depth);
        }

        Some(EfbRect {
            x: x0,
            y: y0,
            width: x1 - x0,
            height: y1 - y0,
        })
    }

    /// Scan out a region as RGBA8 bytes, clipped to the framebuffer
    pub fn scanout_rgba8(&self, rect: EfbRect) -> Vec<u8> {
        let x1 = rect.x.saturating_add(rect.width).min(self.width);
        let y1 = rect.y.saturating_add(rect.height).min(self.height);
        let mut out = Vec::with_capacity(rect.area() as usize * 4);
        for y in rect.y.min(y1)..y1 {
            for x in rect.x.min(x1)..x1 {
                let argb = self.color[(y * self.width + x) as usize];
                out.extend_from_slice(&[
                    (argb >> 16) as u8,
                    (argb >> 8) as u8,
                    argb as u8,
                    (argb >> 24) as u8,
                ]);
            }
        }
        out
    }

    /// Zero both planes
    pub fn reset(&mut self) {
        self.color.fill(0);
        self.depth.fill(0);
    }
}

impl Default for Efb {
    fn default() -> Self {
        Self::new(Self::DEFAULT_WIDTH, Self::DEFAULT_HEIGHT)
    }
}
