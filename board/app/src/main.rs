//! `cubesat`: the telemetry node on the bench board.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use bench_board::{BoardBuilder, FileStorage, HostSystem, HttpNetwork, LogIndicator, SimulatedBus};
use clap::{Parser, Subcommand};
use telemetry_node::{BootError, ConfigFault, NodeSettings, StorageFault, StorageSink, TelemetryLoop};

const BOOT_FAILURE_EXIT: u8 = 2;

type BenchNode = TelemetryLoop<SimulatedBus, FileStorage, HttpNetwork, LogIndicator, HostSystem>;

#[derive(Parser)]
#[command(name = "cubesat", author, version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Boot the node and run the telemetry loop.
    Run {
        #[arg(long)]
        settings: Option<PathBuf>,
        /// Start with the emulated sensor bus unplugged.
        #[arg(long)]
        bus_disconnected: bool,
        /// Stop after this many cycles instead of running forever.
        #[arg(long)]
        cycles: Option<u32>,
    },
    /// Remove every file on the storage medium.
    Clear {
        #[arg(long)]
        settings: Option<PathBuf>,
    },
    /// Print every persisted record, one JSON object per line.
    Read {
        #[arg(long)]
        settings: Option<PathBuf>,
    },
    /// Hard-reset the node; the process exits for its supervisor to restart.
    Reset {
        #[arg(long)]
        settings: Option<PathBuf>,
    },
}

#[derive(Debug, thiserror::Error)]
enum AppError {
    #[error("cannot read settings {0}: {1}")]
    SettingsFile(String, std::io::Error),
    #[error("{0}")]
    Config(#[from] ConfigFault),
    #[error("{0}")]
    Boot(#[from] BootError),
    #[error("{0}")]
    Storage(#[from] StorageFault),
}

fn load_settings(path: Option<&Path>) -> Result<NodeSettings, AppError> {
    let Some(path) = path else {
        let settings = NodeSettings::new();
        settings.validate()?;
        return Ok(settings);
    };
    let text = fs::read_to_string(path)
        .map_err(|err| AppError::SettingsFile(path.display().to_string(), err))?;
    Ok(NodeSettings::from_json(&text)?)
}

fn mounted_sink(settings: &NodeSettings) -> Result<StorageSink<FileStorage>, AppError> {
    let mut sink = StorageSink::new(FileStorage::new(&settings.mount_path), &settings.log_file_name);
    sink.mount()?;
    Ok(sink)
}

fn bench_node(settings: NodeSettings, bus_disconnected: bool) -> BenchNode {
    let board = BoardBuilder::new()
        .mount_path(&settings.mount_path)
        .bus_disconnected(bus_disconnected)
        .build();

    TelemetryLoop::new(
        settings,
        board.bus,
        board.storage,
        board.network,
        board.indicator,
        board.system,
    )
}

fn run(settings: NodeSettings, bus_disconnected: bool, cycles: Option<u32>) -> Result<(), AppError> {
    let mut node = bench_node(settings, bus_disconnected);
    node.boot()?;

    let Some(cycles) = cycles else {
        node.run()
    };
    for _ in 0..cycles {
        node.run_cycle();
    }
    let stats = node.stats();
    log::info!(
        "{} cycles, {} sensor faults, {} storage faults, {} delivered, {} delivery failures",
        stats.cycles,
        stats.sensor_faults,
        stats.storage_faults,
        stats.deliveries,
        stats.delivery_failures
    );
    Ok(())
}

fn reset(settings: NodeSettings) -> Result<(), AppError> {
    bench_node(settings, false).hard_reset()
}

fn clear(settings: NodeSettings) -> Result<(), AppError> {
    let removed = mounted_sink(&settings)?.clear()?;
    println!("removed {} file(s) from {}", removed, settings.mount_path);
    Ok(())
}

fn read(settings: NodeSettings) -> Result<(), AppError> {
    let mut sink = mounted_sink(&settings)?;
    for record in sink.records()? {
        match record.to_json() {
            Ok(json) => println!("{}", json),
            Err(err) => log::warn!("{}", err),
        }
    }
    Ok(())
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Run {
            settings,
            bus_disconnected,
            cycles,
        } => load_settings(settings.as_deref()).and_then(|s| run(s, bus_disconnected, cycles)),
        Command::Clear { settings } => load_settings(settings.as_deref()).and_then(clear),
        Command::Read { settings } => load_settings(settings.as_deref()).and_then(read),
        Command::Reset { settings } => load_settings(settings.as_deref()).and_then(reset),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            log::error!("{}", err);
            match err {
                AppError::Config(_) | AppError::Boot(_) => ExitCode::from(BOOT_FAILURE_EXIT),
                _ => ExitCode::FAILURE,
            }
        }
    }
}
