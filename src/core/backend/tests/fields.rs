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

//! Field bracketing and presentation tests

use super::super::*;
use super::{
    context, count, recording_backend, recording_backend_with, start_loop, stop_loop,
    wait_until, RecordingDevice,
};

fn single_core() -> VideoConfig {
    VideoConfig {
        dual_core: false,
        ..VideoConfig::default()
    }
}

#[test]
fn test_end_without_begin_is_violation() {
    let (backend, _) = recording_backend();
    assert!(matches!(
        backend.end_field(),
        Err(VideoError::Usage(UsageViolation::NoOpenField))
    ));
    assert_eq!(backend.field_snapshot().completed, 0);
}

#[test]
fn test_begin_twice_is_violation() {
    let (backend, _) = recording_backend();
    backend.begin_field(FieldParity::Odd, 0, 0, 640, 240).unwrap();
    assert!(matches!(
        backend.begin_field(FieldParity::Even, 0, 1, 640, 240),
        Err(VideoError::Usage(UsageViolation::FieldAlreadyOpen))
    ));

    // The first field is still the open one
    let open = backend.field_snapshot().open.unwrap();
    assert_eq!(open.parity, FieldParity::Odd);
    assert_eq!(open.y, 0);

    let ended = backend.end_field().unwrap();
    assert_eq!(ended, open);
}

#[test]
fn test_fields_require_initialized_backend() {
    let (device, _) = RecordingDevice::new("Cold");
    let backend = VideoBackend::new(Box::new(device), &context());
    assert!(matches!(
        backend.begin_field(FieldParity::Odd, 0, 0, 640, 240),
        Err(VideoError::Usage(UsageViolation::InvalidPhase {
            operation: "begin_field",
            ..
        }))
    ));
    assert!(matches!(
        backend.end_field(),
        Err(VideoError::Usage(UsageViolation::InvalidPhase { .. }))
    ));
}

#[test]
fn test_completed_fields_presented_by_loop() {
    let (backend, log) = recording_backend();
    let handle = start_loop(&backend);

    backend.begin_field(FieldParity::Odd, 0, 0, 640, 240).unwrap();
    backend.end_field().unwrap();
    backend.begin_field(FieldParity::Even, 0, 1, 640, 240).unwrap();
    backend.end_field().unwrap();

    assert!(wait_until(|| backend.frames_presented() == 2));
    assert_eq!(count(&log, "present Odd"), 1);
    assert_eq!(count(&log, "present Even"), 1);

    let snapshot = backend.field_snapshot();
    assert_eq!(snapshot.completed, 2);
    assert!(snapshot.open.is_none());
    assert_eq!(snapshot.last_completed.map(|f| f.parity), Some(FieldParity::Even));

    stop_loop(&backend, handle);
}

#[test]
fn test_single_core_presents_inline_on_render_thread() {
    let (backend, log) = recording_backend_with(single_core());
    backend.prepare().unwrap();

    backend.begin_field(FieldParity::Odd, 0, 0, 640, 240).unwrap();
    backend.end_field().unwrap();
    assert_eq!(count(&log, "present Odd"), 1);
    assert_eq!(backend.frames_presented(), 1);

    backend.cleanup().unwrap();
}

#[test]
fn test_rendering_disabled_skips_presentation() {
    let (backend, log) = recording_backend_with(single_core());
    backend.prepare().unwrap();

    backend.set_rendering(false);
    backend.begin_field(FieldParity::Odd, 0, 0, 640, 240).unwrap();
    backend.end_field().unwrap();
    assert_eq!(count(&log, "present Odd"), 0);
    assert_eq!(backend.frames_presented(), 0);
    // The field still counts as completed
    assert_eq!(backend.field_snapshot().completed, 1);

    backend.set_rendering(true);
    backend.begin_field(FieldParity::Even, 0, 1, 640, 240).unwrap();
    backend.end_field().unwrap();
    assert_eq!(count(&log, "present Even"), 1);

    backend.cleanup().unwrap();
}

#[test]
fn test_messages_handed_to_device_until_cleared() {
    let (backend, log) = recording_backend_with(single_core());
    backend.prepare().unwrap();

    backend.add_message("saved state 1", 60_000);
    backend.begin_field(FieldParity::Odd, 0, 0, 640, 240).unwrap();
    backend.end_field().unwrap();
    assert_eq!(count(&log, "message saved state 1"), 1);

    backend.clear_messages();
    backend.begin_field(FieldParity::Even, 0, 1, 640, 240).unwrap();
    backend.end_field().unwrap();
    assert_eq!(count(&log, "message saved state 1"), 1);
    assert_eq!(count(&log, "present Even"), 1);

    backend.cleanup().unwrap();
}

#[test]
fn test_initialize_clears_open_field() {
    let (backend, _) = recording_backend();
    backend.begin_field(FieldParity::Odd, 0, 0, 640, 240).unwrap();
    backend.shutdown().unwrap();
    backend.initialize(WindowHandle::HEADLESS).unwrap();

    assert_eq!(backend.field_snapshot(), FieldSnapshot::default());
    backend.begin_field(FieldParity::Even, 0, 0, 640, 240).unwrap();
}
