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

//! Backend registry tests

use super::super::*;
use super::{context, count, RecordingDevice};

#[test]
fn test_populate_list_order_and_default() {
    let mut registry = BackendRegistry::new(context());
    assert!(registry.is_empty());
    assert!(registry.active().is_none());

    registry.populate_list();
    assert_eq!(registry.names(), vec!["Null", "Software Renderer"]);
    assert_eq!(registry.len(), 2);
    assert_eq!(registry.active().unwrap().name(), "Null");
}

#[test]
fn test_activate_unknown_name() {
    let mut registry = BackendRegistry::new(context());
    registry.populate_list();

    match registry.activate_backend("Vulkan") {
        Err(VideoError::NotFound { name }) => assert_eq!(name, "Vulkan"),
        other => panic!("expected NotFound, got {:?}", other.map(|b| b.name().to_string())),
    }
    // Names are matched exactly
    assert!(registry.activate_backend("null").is_err());
    assert_eq!(registry.active().unwrap().name(), "Null");
}

#[test]
fn test_activate_switches_selection() {
    let mut registry = BackendRegistry::new(context());
    registry.populate_list();

    let software = registry.activate_backend("Software Renderer").unwrap();
    assert_eq!(software.display_name(), "Software Renderer");
    assert!(Arc::ptr_eq(&registry.active().unwrap(), &software));
    assert!(Arc::ptr_eq(&registry.get("Software Renderer").unwrap(), &software));
    assert!(registry.get("Missing").is_none());
}

#[test]
fn test_switching_shuts_previous_down_once() {
    let mut registry = BackendRegistry::new(context());
    let (device, log) = RecordingDevice::new("Recorder");
    let recorder = registry.register(Box::new(device));
    registry.populate_list();
    registry.activate_backend("Recorder").unwrap();

    recorder.initialize(WindowHandle::HEADLESS).unwrap();
    registry.activate_backend("Null").unwrap();
    assert!(!recorder.is_initialized());
    assert_eq!(count(&log, "shutdown"), 1);

    // Re-activating the current backend is a no-op
    registry.activate_backend("Null").unwrap();
    registry.activate_backend("Recorder").unwrap();
    assert_eq!(count(&log, "shutdown"), 1);
}

#[test]
fn test_register_keeps_existing_selection() {
    let mut registry = BackendRegistry::new(context());
    let (first, _) = RecordingDevice::new("First");
    let (second, _) = RecordingDevice::new("Second");
    registry.register(Box::new(first));
    registry.register(Box::new(second));
    assert_eq!(registry.active().unwrap().name(), "First");
}

#[test]
fn test_clear_list_shuts_active_down() {
    let mut registry = BackendRegistry::new(context());
    let (device, log) = RecordingDevice::new("Recorder");
    let recorder = registry.register(Box::new(device));
    recorder.initialize(WindowHandle::HEADLESS).unwrap();

    registry.clear_list().unwrap();
    assert!(registry.is_empty());
    assert!(registry.active().is_none());
    assert_eq!(count(&log, "shutdown"), 1);
    assert_eq!(recorder.phase(), BackendPhase::Uninitialized);
}
