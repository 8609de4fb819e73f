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

#[test]
fn test_ram_read_write() {
    let ram = MainRam::new(0x1000);

    ram.write(0x100, &[1, 2, 3, 4]).unwrap();

    let mut buf = [0u8; 4];
    ram.read(0x100, &mut buf).unwrap();
    assert_eq!(buf, [1, 2, 3, 4]);
}

#[test]
fn test_ram_mirrors() {
    let ram = MainRam::new(0x1000);

    ram.write(0xC000_0020, &[0xAB]).unwrap();

    let mut cached = [0u8; 1];
    ram.read(0x8000_0020, &mut cached).unwrap();
    assert_eq!(cached[0], 0xAB);
}

#[test]
fn test_ram_out_of_bounds() {
    let ram = MainRam::new(0x100);

    let mut buf = [0u8; 4];
    assert!(matches!(
        ram.read(0xFE, &mut buf),
        Err(VideoError::InvalidMemoryAccess {
            address: 0xFE,
            len: 4
        })
    ));
    assert!(ram.write(0x100, &[0]).is_err());

    // Last valid byte
    assert!(ram.write(0xFF, &[0x55]).is_ok());
}

#[test]
fn test_tracing_memory_records_writes() {
    let mem = TracingMemory::new(MainRam::new(0x100));

    mem.write(0x10, &[0; 32]).unwrap();
    mem.write(0x40, &[0; 8]).unwrap();

    assert_eq!(mem.writes(), vec![(0x10, 32), (0x40, 8)]);
    assert_eq!(mem.size(), 0x100);
}
