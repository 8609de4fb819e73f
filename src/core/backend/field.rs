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

//! Video field bookkeeping
//!
//! Interlaced output alternates odd and even fields. The CPU thread brackets
//! each field with `begin_field`/`end_field`; a completed field is what gets
//! presented.
//!
//! Both calls wait while another thread holds the pause lock.

use super::{violation, VideoBackend};
use crate::core::error::{Result, UsageViolation};
use crate::core::lock_unpoisoned;
use bincode::{Decode, Encode};
use serde::{Deserialize, Serialize};

/// Field parity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Encode, Decode)]
pub enum FieldParity {
    Odd,
    Even,
}

impl FieldParity {
    /// The other parity
    pub fn flip(self) -> Self {
        match self {
            FieldParity::Odd => FieldParity::Even,
            FieldParity::Even => FieldParity::Odd,
        }
    }
}

/// Parity and source rectangle of one field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Encode, Decode)]
pub struct FieldRect {
    pub parity: FieldParity,
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// Serializable copy of [`FieldState`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, Encode, Decode)]
pub struct FieldSnapshot {
    pub open: Option<FieldRect>,
    pub last_completed: Option<FieldRect>,
    pub completed: u64,
}

/// Open/completed field tracking
#[derive(Debug, Default)]
pub struct FieldState {
    open: Option<FieldRect>,
    last_completed: Option<FieldRect>,
    completed: u64,
}

impl FieldState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a field
    pub fn begin(&mut self, field: FieldRect) -> std::result::Result<(), UsageViolation> {
        if self.open.is_some() {
            return Err(UsageViolation::FieldAlreadyOpen);
        }
        self.open = Some(field);
        Ok(())
    }

    /// Close the open field, returning it
    pub fn end(&mut self) -> std::result::Result<FieldRect, UsageViolation> {
        let field = self.open.take().ok_or(UsageViolation::NoOpenField)?;
        self.last_completed = Some(field);
        self.completed += 1;
        Ok(field)
    }

    pub fn open(&self) -> Option<FieldRect> {
        self.open
    }

    pub fn last_completed(&self) -> Option<FieldRect> {
        self.last_completed
    }

    pub fn completed(&self) -> u64 {
        self.completed
    }

    pub fn snapshot(&self) -> FieldSnapshot {
        FieldSnapshot {
            open: self.open,
            last_completed: self.last_completed,
            completed: self.completed,
        }
    }

    pub fn restore(&mut self, snapshot: &FieldSnapshot) {
        self.open = snapshot.open;
        self.last_completed = snapshot.last_completed;
        self.completed = snapshot.completed;
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

impl VideoBackend {
    /// Open a field on the CPU thread
    pub fn begin_field(
        &self,
        parity: FieldParity,
        x: u32,
        y: u32,
        width: u32,
        height: u32,
    ) -> Result<()> {
        self.expect_initialized("begin_field")?;
        let field = FieldRect {
            parity,
            x,
            y,
            width,
            height,
        };
        {
            let _gate = self.fifo.gate().enter();
            lock_unpoisoned(&self.fields)
                .begin(field)
                .map_err(violation)?;
        }
        log::trace!("Field begin: {:?}", field);
        Ok(())
    }

    /// Close the open field and queue it for presentation
    ///
    /// In single-core mode on the rendering thread the field is presented
    /// immediately; otherwise the rendering thread presents it at its next
    /// checkpoint.
    pub fn end_field(&self) -> Result<FieldRect> {
        self.expect_initialized("end_field")?;
        let field = {
            let _gate = self.fifo.gate().enter();
            lock_unpoisoned(&self.fields).end().map_err(violation)?
        };
        log::trace!("Field end: {:?}", field);

        let mut ctl = lock_unpoisoned(&self.control);
        if !self.config.dual_core && !ctl.loop_active && self.is_render_thread() {
            drop(ctl);
            self.present(field);
        } else {
            ctl.present_queue.push_back(field);
            self.wakeup.notify_all();
        }
        Ok(field)
    }
}
