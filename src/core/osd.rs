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

//! On-screen display messages

use std::time::{Duration, Instant};

/// A single timed message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OsdMessage {
    pub text: String,
    pub expires_at: Instant,
}

/// Queue of timed messages handed to the device on present
#[derive(Debug, Default)]
pub struct OsdMessages {
    messages: Vec<OsdMessage>,
}

impl OsdMessages {
    pub fn new() -> Self {
        Self::default()
    }

    /// Show `text` for `milliseconds`
    pub fn add(&mut self, text: impl Into<String>, milliseconds: u32) {
        self.add_at(text, milliseconds, Instant::now());
    }

    fn add_at(&mut self, text: impl Into<String>, milliseconds: u32, now: Instant) {
        let text = text.into();
        log::info!("OSD: {}", text);
        self.messages.push(OsdMessage {
            text,
            expires_at: now + Duration::from_millis(u64::from(milliseconds)),
        });
    }

    /// Drop every message
    pub fn clear(&mut self) {
        self.messages.clear();
    }

    /// Drop expired messages and return the text of those still visible
    pub fn visible(&mut self, now: Instant) -> Vec<String> {
        self.messages.retain(|m| m.expires_at > now);
        self.messages.iter().map(|m| m.text.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_expire() {
        let mut osd = OsdMessages::new();
        let now = Instant::now();
        osd.add_at("short", 10, now);
        osd.add_at("long", 5000, now);

        assert_eq!(osd.visible(now), vec!["short", "long"]);
        assert_eq!(osd.visible(now + Duration::from_millis(20)), vec!["long"]);
        assert_eq!(osd.len(), 1);
    }

    #[test]
    fn test_clear() {
        let mut osd = OsdMessages::new();
        osd.add("hello", 1000);
        osd.clear();
        assert!(osd.is_empty());
    }
}
