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

//! Video core configuration
//!
//! Settings are read from a TOML file and may be overridden per-process with
//! `GXVIDEO_*` environment variables (the binary loads a `.env` file first, so
//! those count too). Missing keys fall back to [`VideoConfig::default`].
//!
//! ```toml
//! backend = "Software Renderer"
//! efb_width = 640
//! efb_height = 528
//! dual_core = true
//! sync_gpu = false
//! ```

use super::error::{Result, VideoError};
use super::timing::TickCount;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Prefix shared by every environment override
pub const ENV_PREFIX: &str = "GXVIDEO_";

/// Video core settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VideoConfig {
    /// Name of the backend to activate
    pub backend: String,

    /// EFB width in pixels
    pub efb_width: u32,

    /// EFB height in pixels
    pub efb_height: u32,

    /// Run the GPU on its own thread
    pub dual_core: bool,

    /// Stop the GPU when it runs out of sync budget
    pub sync_gpu: bool,

    /// Budget above which `sync` blocks the CPU thread
    pub sync_gpu_max_distance: TickCount,

    /// Budget below which the GPU may not run ahead
    pub sync_gpu_min_distance: TickCount,

    /// GPU cost of one FIFO byte, in CPU ticks
    pub gpu_cycles_per_byte: TickCount,

    /// Commands executed between checkpoints
    pub commands_per_checkpoint: u32,

    /// Ask the device for deterministic output from startup
    pub want_determinism: bool,
}

impl Default for VideoConfig {
    fn default() -> Self {
        Self {
            backend: "Null".to_string(),
            efb_width: 640,
            efb_height: 528,
            dual_core: true,
            sync_gpu: false,
            sync_gpu_max_distance: 200_000,
            sync_gpu_min_distance: -200_000,
            gpu_cycles_per_byte: 4,
            commands_per_checkpoint: 64,
            want_determinism: false,
        }
    }
}

impl VideoConfig {
    /// Parse a TOML document
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: Self = toml::from_str(text).map_err(|e| VideoError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load a TOML file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        log::info!("Loaded video config from {}", path.as_ref().display());
        Self::from_toml_str(&text)
    }

    /// Serialize to TOML
    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| VideoError::Config(e.to_string()))
    }

    /// Apply `GXVIDEO_*` overrides from the process environment
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        self.apply_overrides(|key| std::env::var(format!("{}{}", ENV_PREFIX, key)).ok())
    }

    /// Apply overrides from an arbitrary lookup (key without prefix, upper case)
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("BACKEND") {
            self.backend = v;
        }
        override_parsed(&lookup, "EFB_WIDTH", &mut self.efb_width)?;
        override_parsed(&lookup, "EFB_HEIGHT", &mut self.efb_height)?;
        override_parsed(&lookup, "DUAL_CORE", &mut self.dual_core)?;
        override_parsed(&lookup, "SYNC_GPU", &mut self.sync_gpu)?;
        override_parsed(&lookup, "SYNC_GPU_MAX_DISTANCE", &mut self.sync_gpu_max_distance)?;
        override_parsed(&lookup, "SYNC_GPU_MIN_DISTANCE", &mut self.sync_gpu_min_distance)?;
        override_parsed(&lookup, "GPU_CYCLES_PER_BYTE", &mut self.gpu_cycles_per_byte)?;
        override_parsed(
            &lookup,
            "COMMANDS_PER_CHECKPOINT",
            &mut self.commands_per_checkpoint,
        )?;
        override_parsed(&lookup, "WANT_DETERMINISM", &mut self.want_determinism)?;
        self.validate()
    }

    /// Reject settings the backend cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.efb_width == 0 || self.efb_height == 0 {
            return Err(VideoError::Config(format!(
                "EFB resolution must be non-zero (got {}x{})",
                self.efb_width, self.efb_height
            )));
        }
        if self.sync_gpu_max_distance <= 0 {
            return Err(VideoError::Config(
                "sync_gpu_max_distance must be positive".to_string(),
            ));
        }
        if self.commands_per_checkpoint == 0 {
            return Err(VideoError::Config(
                "commands_per_checkpoint must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

fn override_parsed<F, T>(lookup: &F, key: &str, slot: &mut T) -> Result<()>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    let Some(raw) = lookup(key) else {
        return Ok(());
    };
    *slot = raw.trim().parse().map_err(|_| {
        VideoError::Config(format!("{}{}: cannot parse '{}'", ENV_PREFIX, key, raw))
    })?;
    log::debug!("Config override {}{} = {}", ENV_PREFIX, key, raw.trim());
    Ok(())
}
