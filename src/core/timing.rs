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

//! GPU sync budget
//!
//! The CPU thread earns ticks as it executes and the rendering thread spends
//! them as it consumes FIFO bytes. Keeping the balance bounded stops the CPU
//! from running arbitrarily far ahead of the GPU (which would blow up input
//! latency and make `sync` points meaningless) without forcing lockstep.
//!
//! # Example
//!
//! ```
//! use gxvideo::core::timing::SyncBudget;
//!
//! let budget = SyncBudget::new(1000, -1000);
//!
//! budget.add(1500);
//! assert_eq!(budget.overshoot(), 500);
//!
//! budget.spend(1200);
//! assert_eq!(budget.ticks(), 300);
//! assert_eq!(budget.overshoot(), 0);
//! ```

use std::sync::atomic::{AtomicI64, Ordering};

/// Tick count type (relative time in CPU cycles)
pub type TickCount = i64;

/// Shared CPU/GPU tick balance
#[derive(Debug)]
pub struct SyncBudget {
    /// CPU ticks not yet worked off by the GPU
    ticks: AtomicI64,

    /// Balance above which the CPU must wait
    max_distance: TickCount,

    /// Balance below which the GPU may not run ahead
    min_distance: TickCount,
}

impl SyncBudget {
    /// Create an empty budget
    pub fn new(max_distance: TickCount, min_distance: TickCount) -> Self {
        Self {
            ticks: AtomicI64::new(0),
            max_distance,
            min_distance: min_distance.min(0),
        }
    }

    /// Current balance
    #[inline]
    pub fn ticks(&self) -> TickCount {
        self.ticks.load(Ordering::Acquire)
    }

    /// Upper bound on the balance
    pub fn max_distance(&self) -> TickCount {
        self.max_distance
    }

    /// Lower bound on the balance
    pub fn min_distance(&self) -> TickCount {
        self.min_distance
    }

    /// Credit CPU ticks, returning the new balance
    pub fn add(&self, ticks: TickCount) -> TickCount {
        self.ticks.fetch_add(ticks, Ordering::AcqRel) + ticks
    }

    /// Debit GPU work, never dropping below `min_distance`
    pub fn spend(&self, ticks: TickCount) -> TickCount {
        let min = self.min_distance;
        let previous = self
            .ticks
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |t| {
                Some((t - ticks).max(min))
            })
            .unwrap_or_else(|t| t);
        (previous - ticks).max(min)
    }

    /// Amount by which the balance exceeds `max_distance`
    pub fn overshoot(&self) -> TickCount {
        (self.ticks() - self.max_distance).max(0)
    }

    /// Whether the CPU has run too far ahead
    #[inline]
    pub fn exceeded(&self) -> bool {
        self.ticks() > self.max_distance
    }

    /// Whether the GPU still has ticks to spend
    #[inline]
    pub fn has_budget(&self) -> bool {
        self.ticks() > 0
    }

    /// Drop any overshoot that could not be worked off
    ///
    /// Returns the amount discarded.
    pub fn clamp_to_max(&self) -> TickCount {
        let max = self.max_distance;
        let previous = self
            .ticks
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |t| Some(t.min(max)))
            .unwrap_or_else(|t| t);
        (previous - max).max(0)
    }

    /// Zero the balance (idle GPU)
    pub fn reset(&self) {
        self.ticks.store(0, Ordering::Release);
    }
}

impl Default for SyncBudget {
    fn default() -> Self {
        Self::new(200_000, -200_000)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spend_clamps_to_min_distance() {
        let budget = SyncBudget::new(100, -50);
        budget.add(10);
        assert_eq!(budget.spend(200), -50);
        assert_eq!(budget.ticks(), -50);
    }

    #[test]
    fn test_clamp_to_max_discards_overshoot() {
        let budget = SyncBudget::new(100, -100);
        budget.add(180);
        assert!(budget.exceeded());
        assert_eq!(budget.clamp_to_max(), 80);
        assert_eq!(budget.ticks(), 100);
        assert!(!budget.exceeded());
        assert_eq!(budget.clamp_to_max(), 0);
    }

    #[test]
    fn test_positive_min_distance_is_clamped() {
        let budget = SyncBudget::new(100, 25);
        assert_eq!(budget.min_distance(), 0);
    }

    #[test]
    fn test_reset() {
        let budget = SyncBudget::default();
        budget.add(5000);
        budget.reset();
        assert_eq!(budget.ticks(), 0);
        assert!(!budget.has_budget());
    }
}
