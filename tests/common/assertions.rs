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

//! Custom assertions for video backend testing

use gxvideo::core::fifo::CommandFifo;
use gxvideo::core::VideoBackend;

/// Assert the GPU has consumed everything published
#[allow(dead_code)]
pub fn assert_fifo_drained(fifo: &CommandFifo) {
    assert!(
        !fifo.can_read(),
        "FIFO not drained: read 0x{:08X}, write 0x{:08X}, distance 0x{:X}",
        fifo.read_pointer(),
        fifo.write_pointer(),
        fifo.read_write_distance()
    );
}

/// Assert the read and write pointers
#[allow(dead_code)]
pub fn assert_fifo_pointers(fifo: &CommandFifo, read: u32, write: u32) {
    assert_eq!(
        (fifo.read_pointer(), fifo.write_pointer()),
        (read, write),
        "FIFO pointers mismatch: expected read 0x{:08X} write 0x{:08X}, got read 0x{:08X} write 0x{:08X}",
        read,
        write,
        fifo.read_pointer(),
        fifo.write_pointer()
    );
}

/// Assert a BP register shadow value
#[allow(dead_code)]
pub fn assert_bp_reg(backend: &VideoBackend, register: u8, expected: u32) {
    let actual = backend.with_gpu(|gpu| gpu.bp_reg(register));
    assert_eq!(
        actual, expected,
        "BP[0x{:02X}] mismatch: expected 0x{:06X}, got 0x{:06X}",
        register, expected, actual
    );
}
