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

use super::super::*;
use std::sync::atomic::{AtomicU16, Ordering};
use std::sync::Arc;

fn register_cell(mapping: &mut Mapping, address: u32) -> Arc<AtomicU16> {
    let cell = Arc::new(AtomicU16::new(0));
    let r = cell.clone();
    let w = cell.clone();
    mapping.register(
        address,
        Box::new(move |_| r.load(Ordering::Acquire)),
        Box::new(move |_, v| w.store(v, Ordering::Release)),
    );
    cell
}

#[test]
fn test_read_write_16bit() {
    let mut mapping = Mapping::new();
    let cell = register_cell(&mut mapping, 0x1000);

    mapping.write16(0x1000, 0xBEEF).unwrap();
    assert_eq!(cell.load(Ordering::Acquire), 0xBEEF);
    assert_eq!(mapping.read16(0x1000).unwrap(), 0xBEEF);
}

#[test]
fn test_read_write_32bit_high_half_first() {
    let mut mapping = Mapping::new();
    let hi = register_cell(&mut mapping, 0x1000);
    let lo = register_cell(&mut mapping, 0x1002);

    mapping.write32(0x1000, 0x1234_5678).unwrap();
    assert_eq!(hi.load(Ordering::Acquire), 0x1234);
    assert_eq!(lo.load(Ordering::Acquire), 0x5678);
    assert_eq!(mapping.read32(0x1000).unwrap(), 0x1234_5678);
}

#[test]
fn test_unmapped_access() {
    let mapping = Mapping::new();

    assert!(mapping.is_empty());
    assert!(mapping.read16(0x2000).is_err());
    assert!(mapping.write16(0x2000, 1).is_err());
}

#[test]
fn test_invalid_handlers_are_harmless() {
    let mut mapping = Mapping::new();
    mapping.register(0x10, Mapping::invalid_read(), Mapping::invalid_write());

    assert!(mapping.contains(0x10));
    assert_eq!(mapping.len(), 1);
    mapping.write16(0x10, 0xFFFF).unwrap();
    assert_eq!(mapping.read16(0x10).unwrap(), 0);
}
