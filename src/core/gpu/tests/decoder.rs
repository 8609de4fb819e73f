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

//! Command decoder tests

use super::super::opcodes::*;

#[test]
fn test_fixed_lengths() {
    assert_eq!(command_length(&[OPCODE_NOP]), Some(1));
    assert_eq!(command_length(&[OPCODE_INVALIDATE_VERTEX_CACHE]), Some(1));
    assert_eq!(command_length(&[OPCODE_LOAD_CP_REG]), Some(6));
    assert_eq!(command_length(&[OPCODE_LOAD_BP_REG]), Some(5));
    assert_eq!(command_length(&[OPCODE_CALL_DISPLAY_LIST]), Some(9));
    assert_eq!(command_length(&[0xEE]), Some(1));
    assert_eq!(command_length(&[]), None);
}

#[test]
fn test_xf_length_needs_header() {
    assert_eq!(command_length(&[OPCODE_LOAD_XF_REG, 0x00, 0x02]), None);
    // count - 1 = 2 -> three words
    assert_eq!(
        command_length(&[OPCODE_LOAD_XF_REG, 0x00, 0x02, 0x10, 0x00]),
        Some(5 + 12)
    );
}

#[test]
fn test_decode_bp() {
    let bytes = [OPCODE_LOAD_BP_REG, 0x47, 0x00, 0xBE, 0xEF];
    let (command, len) = decode(&bytes).unwrap();
    assert_eq!(len, 5);
    assert_eq!(
        command,
        GxCommand::LoadBpReg {
            register: 0x47,
            value: 0xBEEF
        }
    );
}

#[test]
fn test_decode_partial_command() {
    let bytes = GxCommand::LoadCpReg {
        register: 0x50,
        value: 0xDEAD_BEEF,
    }
    .encode();
    assert!(decode(&bytes[..5]).is_none());
    assert_eq!(decode(&bytes).map(|(_, len)| len), Some(6));
}

#[test]
fn test_decode_xf_values() {
    let command = GxCommand::LoadXfReg {
        address: 0x1000,
        values: vec![1, 2, 3],
    };
    let bytes = command.encode();
    assert_eq!(bytes.len(), 17);
    assert_eq!(&bytes[1..5], &[0x00, 0x02, 0x10, 0x00]);
    assert_eq!(decode(&bytes), Some((command, 17)));
}

#[test]
fn test_decode_unknown_skips_one_byte() {
    assert_eq!(decode(&[0xFF, 0x00, 0x00]), Some((GxCommand::Unknown(0xFF), 1)));
}

#[test]
fn test_bp_value_truncated_to_24_bits() {
    let bytes = GxCommand::LoadBpReg {
        register: 0x52,
        value: 0xFF00_0800,
    }
    .encode();
    assert_eq!(bytes, vec![OPCODE_LOAD_BP_REG, 0x52, 0x00, 0x08, 0x00]);
}
