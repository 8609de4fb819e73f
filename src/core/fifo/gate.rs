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


//! Write gate held by the pause lock owner
//!
//! While a thread holds the pause lock, the FIFO registers, field state and
//! EFB may only be changed by that thread. Every other writer enters the gate
//! first and blocks until the lock is released. The guard is held for the
//! whole write, so closing the gate also waits for writes already in flight.

use crate::core::{lock_unpoisoned, wait_unpoisoned};
use std::sync::{Condvar, Mutex, MutexGuard};
use std::thread::{self, ThreadId};

/// Gate closed by the pause lock owner
#[derive(Debug, Default)]
pub struct WriteGate {
    owner: Mutex<Option<ThreadId>>,
    released: Condvar,
}

/// Permission to write guarded state; release by dropping it
pub struct GateGuard<'a> {
    _owner: MutexGuard<'a, Option<ThreadId>>,
}

impl WriteGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait until the calling thread may write, then hold the gate
    ///
    /// Must not be nested: a thread already holding a guard deadlocks.
    pub fn enter(&self) -> GateGuard<'_> {
        let me = thread::current().id();
        let mut owner = lock_unpoisoned(&self.owner);
        if owner.is_some_and(|o| o != me) {
            log::debug!("Write from {:?} held until the pause lock is released", me);
            while owner.is_some_and(|o| o != me) {
                owner = wait_unpoisoned(&self.released, owner);
            }
        }
        GateGuard { _owner: owner }
    }

    /// Thread currently holding the gate closed
    pub fn owner(&self) -> Option<ThreadId> {
        *lock_unpoisoned(&self.owner)
    }

    /// Reserve writes for `owner`, waiting for writes in flight
    pub(crate) fn close(&self, owner: ThreadId) {
        *lock_unpoisoned(&self.owner) = Some(owner);
    }

    /// Let every thread write again
    pub(crate) fn open(&self) {
        *lock_unpoisoned(&self.owner) = None;
        self.released.notify_all();
    }
}
