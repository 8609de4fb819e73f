use anyhow::Result;
use clap::{Parser, Subcommand};
use colored::*;
use std::process::{Command, Stdio};
use std::time::Instant;

#[derive(Parser)]
#[command(name = "x")]
#[command(about = "Development automation for gxvideo")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Format check, clippy, tests, then a smoke session in both threading modes
    Ci {
        #[arg(long)]
        verbose: bool,
    },
    /// Format code
    Fmt {
        #[arg(long)]
        check: bool,
    },
    /// Run clippy
    Clippy {
        #[arg(long)]
        fix: bool,
    },
    /// Run tests (everything when no filter is given)
    Test {
        #[arg(long)]
        doc: bool,
        /// Only the threaded integration tests under tests/
        #[arg(long)]
        integration: bool,
        /// Library tests of one module: fifo, backend, gpu, memory, interrupt
        #[arg(short, long)]
        module: Option<Module>,
    },
    /// Run the criterion benchmarks
    Bench,
    /// Run a headless rendering session through the gxvideo binary
    Smoke {
        /// Backend to activate
        #[arg(short = 'b', long, default_value = "Software Renderer")]
        backend: String,
        /// Number of fields to render
        #[arg(short = 'n', long, default_value = "120")]
        frames: u32,
        /// Run the GPU on the CPU thread
        #[arg(long)]
        single_core: bool,
        #[arg(long)]
        release: bool,
    },
}

#[derive(Clone, Copy, clap::ValueEnum)]
enum Module {
    Fifo,
    Backend,
    Gpu,
    Memory,
    Interrupt,
}

impl Module {
    fn path(self) -> &'static str {
        match self {
            Module::Fifo => "core::fifo",
            Module::Backend => "core::backend",
            Module::Gpu => "core::gpu",
            Module::Memory => "core::memory",
            Module::Interrupt => "core::interrupt",
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Ci { verbose } => run_ci(verbose),
        Commands::Fmt { check } => run_fmt(check),
        Commands::Clippy { fix } => run_clippy(fix),
        Commands::Test {
            doc,
            integration,
            module,
        } => run_test(doc, integration, module),
        Commands::Bench => cargo(&["bench"]),
        Commands::Smoke {
            backend,
            frames,
            single_core,
            release,
        } => run_smoke(&backend, frames, single_core, release),
    }
}

fn run_ci(verbose: bool) -> Result<()> {
    println!("{}", "=== Running CI Pipeline ===".bold().blue());
    let start = Instant::now();

    run_task("Format Check", || run_fmt(true), verbose)?;
    run_task("Clippy", || run_clippy(false), verbose)?;
    run_task("Test", || run_test(false, false, None), verbose)?;
    run_task(
        "Smoke (dual-core)",
        || run_smoke("Software Renderer", 30, false, false),
        verbose,
    )?;
    run_task(
        "Smoke (single-core)",
        || run_smoke("Null", 30, true, false),
        verbose,
    )?;

    println!(
        "\n{} {}",
        "✓ CI passed in".green().bold(),
        format!("{:.2}s", start.elapsed().as_secs_f64()).bold()
    );
    Ok(())
}

fn run_fmt(check: bool) -> Result<()> {
    if check {
        cargo(&["fmt", "--all", "--", "--check"])
    } else {
        cargo(&["fmt", "--all"])
    }
}

fn run_clippy(fix: bool) -> Result<()> {
    if fix {
        cargo(&["clippy", "--all-targets", "--fix"])
    } else {
        cargo(&["clippy", "--all-targets", "--", "-D", "warnings"])
    }
}

fn run_test(doc: bool, integration: bool, module: Option<Module>) -> Result<()> {
    if doc {
        return cargo(&["test", "--doc"]);
    }
    if integration {
        println!("{} Running integration tests...", "→".blue());
        return cargo(&["test", "--test", "integration_test"]);
    }
    match module {
        Some(module) => {
            println!("{} Running {} tests...", "→".blue(), module.path().bold());
            cargo(&["test", "--lib", module.path()])
        }
        None => cargo(&["test"]),
    }
}

fn run_smoke(backend: &str, frames: u32, single_core: bool, release: bool) -> Result<()> {
    println!(
        "{} {} x{} ({}{})",
        "→".blue(),
        backend.cyan(),
        frames.to_string().bold(),
        if single_core {
            "single-core".yellow()
        } else {
            "dual-core".green()
        },
        if release { ", release" } else { "" }
    );

    let frames = frames.to_string();
    let mut args = vec!["run", "--bin", "gxvideo"];
    if release {
        args.push("--release");
    }
    args.extend(["--", "--backend", backend, "-n", frames.as_str(), "--json"]);
    if single_core {
        args.push("--single-core");
    }
    cargo(&args)
}

fn run_task<F>(name: &str, task: F, verbose: bool) -> Result<()>
where
    F: FnOnce() -> Result<()>,
{
    print!("{} {} ... ", "→".blue(), name);
    let start = Instant::now();

    match task() {
        Ok(_) => {
            println!(
                "{} {}",
                "✓".green().bold(),
                if verbose {
                    format!("({:.2}s)", start.elapsed().as_secs_f64())
                } else {
                    String::new()
                }
            );
            Ok(())
        }
        Err(e) => {
            println!("{}", "✗".red().bold());
            Err(e)
        }
    }
}

fn cargo(args: &[&str]) -> Result<()> {
    let status = Command::new("cargo")
        .args(args)
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit())
        .status()?;

    if !status.success() {
        anyhow::bail!("cargo {} failed with exit code: {}", args.join(" "), status);
    }
    Ok(())
}
