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

//! EFB access tests

use super::super::*;

#[test]
fn test_color_round_trip() {
    let mut gpu = GpuState::new(640, 528);

    assert_eq!(gpu.access_efb(EfbAccessType::PokeColor, 10, 20, 0xFF00_FF00), 0);
    assert_eq!(gpu.access_efb(EfbAccessType::PeekColor, 10, 20, 0), 0xFF00_FF00);

    // Poke returns the previous value
    assert_eq!(
        gpu.access_efb(EfbAccessType::PokeColor, 10, 20, 0x1234_5678),
        0xFF00_FF00
    );
}

#[test]
fn test_depth_is_24_bit() {
    let mut gpu = GpuState::new(640, 528);

    gpu.access_efb(EfbAccessType::PokeZ, 0, 0, 0xAB12_3456);
    assert_eq!(gpu.access_efb(EfbAccessType::PeekZ, 0, 0, 0), 0x0012_3456);
}

#[test]
fn test_out_of_bounds_returns_sentinel() {
    let mut gpu = GpuState::new(640, 528);

    assert_eq!(
        gpu.access_efb(EfbAccessType::PokeColor, 640, 0, 0xFFFF_FFFF),
        EFB_ACCESS_SENTINEL
    );
    assert_eq!(
        gpu.access_efb(EfbAccessType::PokeZ, 0, 528, 0x00FF_FFFF),
        EFB_ACCESS_SENTINEL
    );
    assert_eq!(
        gpu.access_efb(EfbAccessType::PeekColor, u32::MAX, u32::MAX, 0),
        EFB_ACCESS_SENTINEL
    );

    // Nothing was written along the edges
    assert_eq!(gpu.access_efb(EfbAccessType::PeekColor, 639, 0, 0), 0);
    assert_eq!(gpu.access_efb(EfbAccessType::PeekZ, 0, 527, 0), 0);
}

#[test]
fn test_bounds_follow_configured_resolution() {
    let mut gpu = GpuState::new(320, 240);
    assert_eq!(gpu.access_efb(EfbAccessType::PokeColor, 400, 10, 7), 0);
    assert_eq!(gpu.access_efb(EfbAccessType::PeekColor, 400, 10, 0), EFB_ACCESS_SENTINEL);
}

#[test]
fn test_bounding_box_index_validation() {
    let gpu = GpuState::default();
    for i in 0..4 {
        assert_eq!(gpu.bounding_box(i).unwrap(), 0);
    }
    assert!(matches!(gpu.bounding_box(4), Err(VideoError::InvalidArgument(_))));
}

#[test]
fn test_scanout_rgba() {
    let mut efb = Efb::new(4, 4);
    efb.access(EfbAccessType::PokeColor, 1, 1, 0x80112233);

    let frame = efb.scanout_rgba8(EfbRect { x: 1, y: 1, width: 2, height: 1 });
    assert_eq!(frame, vec![0x11, 0x22, 0x33, 0x80, 0, 0, 0, 0]);
}
