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

//! Command FIFO tests
//!
//! - `distance`: pointer bookkeeping and wraparound
//! - `watermark`: edge-triggered watermark conditions
//! - `breakpoint`: breakpoint latch and consumption stop
//! - `token`: PE token take-once semantics


use super::*;

/// FIFO with a 4 KiB ring at 0x1000
fn ring_fifo() -> (CommandFifo, Arc<InterruptController>) {
    let ic = Arc::new(InterruptController::new());
    let fifo = CommandFifo::new(Arc::clone(&ic));
    fifo.init_ring(0x1000, 0x2000);
    (fifo, ic)
}
