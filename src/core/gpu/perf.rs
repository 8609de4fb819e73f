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

//! Pixel engine performance counters

/// Counter selectable through `get_query_result`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PerfQueryType {
    /// Pixels entering the early depth test
    ZcompInputZcomploc,
    /// Pixels passing the early depth test
    ZcompOutputZcomploc,
    /// Pixels entering the late depth test
    ZcompInput,
    /// Pixels passing the late depth test
    ZcompOutput,
    /// Pixels reaching the blender
    BlendInput,
    /// Clocks spent copying out of the EFB
    EfbCopyClocks,
}

impl PerfQueryType {
    /// Every counter, in register order
    pub const ALL: [PerfQueryType; 6] = [
        PerfQueryType::ZcompInputZcomploc,
        PerfQueryType::ZcompOutputZcomploc,
        PerfQueryType::ZcompInput,
        PerfQueryType::ZcompOutput,
        PerfQueryType::BlendInput,
        PerfQueryType::EfbCopyClocks,
    ];

    fn index(self) -> usize {
        self as usize
    }
}

/// Saturating 32-bit counters
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PerfCounters {
    counts: [u32; 6],
}

impl PerfCounters {
    pub fn get(&self, query: PerfQueryType) -> u32 {
        self.counts[query.index()]
    }

    pub fn add(&mut self, query: PerfQueryType, amount: u64) {
        let slot = &mut self.counts[query.index()];
        *slot = slot.saturating_add(u32::try_from(amount).unwrap_or(u32::MAX));
    }

    /// Account for `pixels` written through the late-Z path
    pub fn record_fill(&mut self, pixels: u64) {
        self.add(PerfQueryType::ZcompInput, pixels);
        self.add(PerfQueryType::ZcompOutput, pixels);
        self.add(PerfQueryType::BlendInput, pixels);
    }

    pub fn reset(&mut self) {
        self.counts = [0; 6];
    }
}
