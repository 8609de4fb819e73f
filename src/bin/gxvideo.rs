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

use clap::Parser;
use gxvideo::core::backend::{
    BackendRegistry, FieldParity, VideoBackend, VideoContext, WindowHandle,
};
use gxvideo::core::config::VideoConfig;
use gxvideo::core::error::{Result, VideoError};
use gxvideo::core::fifo::registers::{offsets, CpControl};
use gxvideo::core::gather_pipe::GatherPipe;
use gxvideo::core::gpu::{bp, GxCommand, PerfQueryType};
use gxvideo::core::interrupt::{interrupts, InterruptController};
use gxvideo::core::memory::{MainRam, Mapping};
use log::{error, info, warn};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Physical address of the CP register block
const CP_REGISTER_BASE: u32 = 0xCC00_0000;

/// Command FIFO ring used by the session
const FIFO_BASE: u32 = 0x0030_0000;
const FIFO_END: u32 = 0x0031_0000;

/// Headless GameCube video backend driver
#[derive(Parser)]
#[command(name = "gxvideo")]
#[command(about = "Drive a video backend through a headless session", long_about = None)]
struct Args {
    /// TOML configuration file
    #[arg(short = 'c', long)]
    config: Option<PathBuf>,

    /// Backend to activate (overrides the configuration)
    #[arg(short = 'b', long)]
    backend: Option<String>,

    /// Number of fields to render
    #[arg(short = 'n', long, default_value = "60")]
    frames: u32,

    /// CPU ticks credited per field
    #[arg(long, default_value = "8100000")]
    ticks_per_frame: i64,

    /// Run the GPU on the CPU thread
    #[arg(long)]
    single_core: bool,

    /// Write a savestate here at the end of the session
    #[arg(long)]
    save_state: Option<PathBuf>,

    /// List available backends and exit
    #[arg(long)]
    list_backends: bool,

    /// Print the effective configuration as TOML and exit
    #[arg(long)]
    print_config: bool,

    /// Print the session summary as JSON
    #[arg(long)]
    json: bool,
}

/// What a session did, for humans or `--json`
#[derive(Debug, Serialize)]
struct SessionSummary {
    backend: String,
    dual_core: bool,
    frames: u32,
    fields_completed: u64,
    frames_presented: u64,
    bursts: u64,
    commands_executed: u64,
    draws_done: u64,
    last_token: u16,
    bounding_box: [u16; 4],
    efb_copy_clocks: u32,
    save_state: Option<PathBuf>,
}

fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    if let Err(e) = dotenvy::dotenv() {
        if !e.not_found() {
            eprintln!("Warning: Failed to load .env file: {}", e);
        }
    }

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let config = load_config(&args)?;

    if args.print_config {
        print!("{}", config.to_toml_string()?);
        return Ok(());
    }

    info!("gxvideo v{}", env!("CARGO_PKG_VERSION"));

    let memory = Arc::new(MainRam::default());
    let interrupts = Arc::new(InterruptController::new());
    interrupts.write_mask(interrupts::CP | interrupts::PE_TOKEN | interrupts::PE_FINISH);
    let context = VideoContext::new(memory, Arc::clone(&interrupts), config.clone());

    let mut registry = BackendRegistry::new(context);
    registry.populate_list();

    if args.list_backends {
        for name in registry.names() {
            println!("{}", name);
        }
        return Ok(());
    }

    let backend = registry.activate_backend(&config.backend).inspect_err(|e| {
        error!("{}; available: {}", e, registry.names().join(", "));
    })?;

    let summary = run_session(&backend, &args)?;
    registry.clear_list()?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        info!(
            "Session complete: {} fields, {} presented, {} commands, last token 0x{:04X}",
            summary.fields_completed,
            summary.frames_presented,
            summary.commands_executed,
            summary.last_token
        );
    }

    Ok(())
}

/// Defaults, then the config file, then `GXVIDEO_*`, then the command line
fn load_config(args: &Args) -> Result<VideoConfig> {
    let mut config = match &args.config {
        Some(path) => VideoConfig::load_from_file(path)?,
        None => VideoConfig::default(),
    };
    config.apply_env_overrides()?;
    if let Some(name) = &args.backend {
        config.backend = name.clone();
    }
    if args.single_core {
        config.dual_core = false;
    }
    config.validate()?;
    Ok(config)
}

/// Program the FIFO the way a game's GX init would, through the CP registers
fn configure_fifo(mapping: &Mapping) -> Result<()> {
    let pairs = [
        (offsets::FIFO_BASE, FIFO_BASE),
        (offsets::FIFO_END, FIFO_END),
        (offsets::FIFO_HI_WATERMARK, (FIFO_END - FIFO_BASE) - 0x4000),
        (offsets::FIFO_LO_WATERMARK, (FIFO_END - FIFO_BASE) / 2),
        (offsets::FIFO_WRITE_POINTER, FIFO_BASE),
        (offsets::FIFO_READ_POINTER, FIFO_BASE),
    ];
    for (offset, value) in pairs {
        mapping.write16(CP_REGISTER_BASE + offset, value as u16)?;
        mapping.write16(CP_REGISTER_BASE + offset + 2, (value >> 16) as u16)?;
    }

    let control = CpControl::READ_ENABLE | CpControl::LINK_ENABLE | CpControl::HI_WATERMARK_INT;
    mapping.write16(CP_REGISTER_BASE + offsets::CONTROL, control.bits())
}

/// Commands for one field: clear the EFB to a frame-dependent color, then
/// signal draw done and a token
fn frame_commands(frame: u32, width: u32, height: u32) -> Vec<GxCommand> {
    let shade = (frame * 4) & 0xFF;
    let load = |register, value| GxCommand::LoadBpReg { register, value };
    vec![
        load(bp::CLEAR_AR, 0xFF00 | shade),
        load(bp::CLEAR_GB, (shade << 8) | (0xFF - shade)),
        load(bp::CLEAR_Z, 0x00FF_FFFF),
        load(bp::EFB_TOP_LEFT, 0),
        load(bp::EFB_SIZE, (width - 1) | ((height - 1) << 10)),
        load(bp::EFB_COPY, bp::COPY_CLEAR),
        load(bp::PE_DONE, 0),
        load(bp::PE_TOKEN_INT, frame & 0xFFFF),
    ]
}

fn spawn_render_thread(backend: &Arc<VideoBackend>) -> Result<JoinHandle<Result<()>>> {
    let backend = Arc::clone(backend);
    let handle = thread::Builder::new()
        .name("gx-render".to_string())
        .spawn(move || {
            backend.prepare()?;
            let result = backend.enter_loop();
            backend.cleanup()?;
            result
        })?;
    Ok(handle)
}

fn run_session(backend: &Arc<VideoBackend>, args: &Args) -> Result<SessionSummary> {
    let config = backend.config().clone();
    backend.initialize(WindowHandle::HEADLESS)?;
    backend.add_message(format!("gxvideo {}", env!("CARGO_PKG_VERSION")), 2000);

    let mut mapping = Mapping::new();
    backend.register_mmio(&mut mapping, CP_REGISTER_BASE);
    configure_fifo(&mapping)?;

    let render_thread = if config.dual_core {
        Some(spawn_render_thread(backend)?)
    } else {
        backend.prepare()?;
        None
    };

    // The EFB copy window is 10 bits wide per axis
    let width = config.efb_width.min(1024);
    let height = config.efb_height.min(1024);
    let mut pipe = GatherPipe::new(Arc::clone(backend));
    let mut last_token = 0;

    for frame in 0..args.frames {
        let parity = if frame % 2 == 0 {
            FieldParity::Odd
        } else {
            FieldParity::Even
        };
        backend.begin_field(parity, 0, 0, width, height)?;
        for command in frame_commands(frame, width, height) {
            pipe.write_command(&command)?;
        }
        pipe.pad_and_flush()?;

        backend.sync(args.ticks_per_frame);
        backend.end_field()?;

        if let Some(token) = backend.fifo().take_token_interrupt() {
            last_token = token;
        }
        if let Err(e) = backend.check_invalid_state() {
            warn!("Stopping session early: {}", e);
            break;
        }
    }

    // Let the GPU catch up before freezing it
    while backend.is_initialized() && backend.fifo().can_read() {
        backend.sync(args.ticks_per_frame);
        thread::sleep(Duration::from_millis(1));
    }
    if let Some(token) = backend.fifo().take_token_interrupt() {
        last_token = token;
    }

    let mut saved = None;
    if let Some(path) = args.save_state.as_ref().filter(|_| backend.is_initialized()) {
        backend.pause_and_lock(true, false)?;
        let state = backend.save_state();
        backend.pause_and_lock(false, true)?;
        state?.save_to_file(path)?;
        info!("Savestate written to {}", path.display());
        saved = Some(path.clone());
    }

    let (commands_executed, draws_done) =
        backend.with_gpu(|gpu| (gpu.commands_executed(), gpu.draw_done_count()));
    let summary = SessionSummary {
        backend: backend.display_name().to_string(),
        dual_core: config.dual_core,
        frames: args.frames,
        fields_completed: backend.field_snapshot().completed,
        frames_presented: backend.frames_presented(),
        bursts: pipe.bursts(),
        commands_executed,
        draws_done,
        last_token,
        bounding_box: [0, 1, 2, 3].map(|i| backend.get_bounding_box(i).unwrap_or(0)),
        efb_copy_clocks: backend.get_query_result(PerfQueryType::EfbCopyClocks),
        save_state: saved,
    };

    if render_thread.is_none() && backend.is_initialized() {
        backend.cleanup()?;
    }
    backend.shutdown()?;
    if let Some(handle) = render_thread {
        handle
            .join()
            .map_err(|_| VideoError::InvalidDeviceState(backend.name().to_string()))??;
    }

    Ok(summary)
}
