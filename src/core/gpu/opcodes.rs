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

//! GX command stream decoding
//!
//! Commands are byte-aligned and big-endian. The first byte selects the
//! command; its length is fixed except for `LOAD_XF_REG`, whose header carries
//! a word count.
//!
//! ```text
//! Opcode | Command                  | Length
//! -------|--------------------------|------------------------------
//! 0x00   | NOP                      | 1
//! 0x08   | LOAD_CP_REG              | 1 + 1 (reg) + 4 (value)
//! 0x10   | LOAD_XF_REG              | 1 + 4 (header) + 4 * count
//! 0x40   | CALL_DISPLAY_LIST        | 1 + 4 (address) + 4 (size)
//! 0x48   | INVALIDATE_VERTEX_CACHE  | 1
//! 0x61   | LOAD_BP_REG              | 1 + 4 (reg << 24 | value)
//! ```
//!
//! Unknown opcodes occupy one byte.

pub const OPCODE_NOP: u8 = 0x00;
pub const OPCODE_LOAD_CP_REG: u8 = 0x08;
pub const OPCODE_LOAD_XF_REG: u8 = 0x10;
pub const OPCODE_CALL_DISPLAY_LIST: u8 = 0x40;
pub const OPCODE_INVALIDATE_VERTEX_CACHE: u8 = 0x48;
pub const OPCODE_LOAD_BP_REG: u8 = 0x61;

/// Bytes needed to find the length of any command
pub const MAX_HEADER_LEN: usize = 5;

/// A decoded GX command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GxCommand {
    Nop,
    LoadCpReg { register: u8, value: u32 },
    LoadXfReg { address: u16, values: Vec<u32> },
    LoadBpReg { register: u8, value: u32 },
    InvalidateVertexCache,
    CallDisplayList { address: u32, size: u32 },
    Unknown(u8),
}

#[inline(always)]
fn be32(bytes: &[u8], at: usize) -> u32 {
    u32::from_be_bytes([bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]])
}

/// Total length of the command starting at `bytes[0]`
///
/// Returns `None` if `bytes` is too short to tell.
pub fn command_length(bytes: &[u8]) -> Option<usize> {
    let opcode = *bytes.first()?;
    Some(match opcode {
        OPCODE_NOP | OPCODE_INVALIDATE_VERTEX_CACHE => 1,
        OPCODE_LOAD_CP_REG => 6,
        OPCODE_LOAD_BP_REG => 5,
        OPCODE_CALL_DISPLAY_LIST => 9,
        OPCODE_LOAD_XF_REG => {
            if bytes.len() < MAX_HEADER_LEN {
                return None;
            }
            let count = (be32(bytes, 1) >> 16) as usize + 1;
            MAX_HEADER_LEN + 4 * count
        }
        _ => 1,
    })
}

/// Decode one whole command
///
/// Returns the command and its length, or `None` if `bytes` does not yet hold
/// all of it.
pub fn decode(bytes: &[u8]) -> Option<(GxCommand, usize)> {
    let len = command_length(bytes)?;
    if bytes.len() < len {
        return None;
    }

    let command = match bytes[0] {
        OPCODE_NOP => GxCommand::Nop,
        OPCODE_INVALIDATE_VERTEX_CACHE => GxCommand::InvalidateVertexCache,
        OPCODE_LOAD_CP_REG => GxCommand::LoadCpReg {
            register: bytes[1],
            value: be32(bytes, 2),
        },
        OPCODE_LOAD_BP_REG => {
            let word = be32(bytes, 1);
            GxCommand::LoadBpReg {
                register: (word >> 24) as u8,
                value: word & 0x00FF_FFFF,
            }
        }
        OPCODE_CALL_DISPLAY_LIST => GxCommand::CallDisplayList {
            address: be32(bytes, 1),
            size: be32(bytes, 5),
        },
        OPCODE_LOAD_XF_REG => {
            let header = be32(bytes, 1);
            let values = bytes[MAX_HEADER_LEN..len]
                .chunks_exact(4)
                .map(|c| u32::from_be_bytes([c[0], c[1], c[2], c[3]]))
                .collect();
            GxCommand::LoadXfReg {
                address: header as u16,
                values,
            }
        }
        other => GxCommand::Unknown(other),
    };

    Some((command, len))
}

impl GxCommand {
    /// Append the wire encoding of this command to `out`
    pub fn encode_into(&self, out: &mut Vec<u8>) {
        match self {
            GxCommand::Nop => out.push(OPCODE_NOP),
            GxCommand::InvalidateVertexCache => out.push(OPCODE_INVALIDATE_VERTEX_CACHE),
            GxCommand::LoadCpReg { register, value } => {
                out.push(OPCODE_LOAD_CP_REG);
                out.push(*register);
                out.extend_from_slice(&value.to_be_bytes());
            }
            GxCommand::LoadBpReg { register, value } => {
                out.push(OPCODE_LOAD_BP_REG);
                let word = (u32::from(*register) << 24) | (value & 0x00FF_FFFF);
                out.extend_from_slice(&word.to_be_bytes());
            }
            GxCommand::CallDisplayList { address, size } => {
                out.push(OPCODE_CALL_DISPLAY_LIST);
                out.extend_from_slice(&address.to_be_bytes());
                out.extend_from_slice(&size.to_be_bytes());
            }
            GxCommand::LoadXfReg { address, values } => {
                // The header cannot express an empty load
                let count = values.len().max(1);
                out.push(OPCODE_LOAD_XF_REG);
                let header = (((count - 1) as u32) << 16) | u32::from(*address);
                out.extend_from_slice(&header.to_be_bytes());
                for i in 0..count {
                    let v = values.get(i).copied().unwrap_or(0);
                    out.extend_from_slice(&v.to_be_bytes());
                }
            }
            GxCommand::Unknown(opcode) => out.push(*opcode),
        }
    }

    /// Wire encoding of this command
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::new();
        self.encode_into(&mut out);
        out
    }
}
