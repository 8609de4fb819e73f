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

//! Command streams for tests

use gxvideo::core::gpu::{bp, GxCommand};

/// BP register with no side effects, used as a progress marker
pub const MARKER: u8 = 0x10;

#[allow(dead_code)]
pub fn marker(value: u32) -> GxCommand {
    GxCommand::LoadBpReg {
        register: MARKER,
        value,
    }
}

/// One draw: bump the marker, then signal draw done
#[allow(dead_code)]
pub fn draw(index: u32) -> Vec<GxCommand> {
    vec![
        marker(index),
        GxCommand::LoadBpReg {
            register: bp::PE_DONE,
            value: 0,
        },
    ]
}

/// Token with interrupt
#[allow(dead_code)]
pub fn token_interrupt(token: u16) -> GxCommand {
    GxCommand::LoadBpReg {
        register: bp::PE_TOKEN_INT,
        value: u32::from(token),
    }
}

/// A mix of every command kind
#[allow(dead_code)]
pub fn mixed_stream() -> Vec<GxCommand> {
    vec![
        GxCommand::Nop,
        GxCommand::LoadCpReg {
            register: 0x50,
            value: 0x0000_1234,
        },
        GxCommand::LoadXfReg {
            address: 0x1000,
            values: vec![1, 2, 3, 4],
        },
        GxCommand::InvalidateVertexCache,
        marker(0x42),
    ]
}
