//! heapsave CLI
//!
//! Runs a WebAssembly guest and writes every file it downloads into a
//! directory, or prints the guest's interface.

use clap::{Parser, Subcommand};
use env_logger::Env;
use heapsave::{DirectorySavePlatform, DownloadImport, RuntimeConfig, WasmRuntime};
use log::{error, info, warn};
use std::path::PathBuf;

/// heapsave CLI
#[derive(Parser)]
#[clap(author, version, about, long_about = None)]
struct Cli {
    /// Subcommand
    #[clap(subcommand)]
    command: Commands,

    /// Log level
    #[clap(short, long, default_value = "info", global = true)]
    log_level: String,
}

/// CLI commands
#[derive(Subcommand)]
enum Commands {
    /// Run a guest entry point and save its downloads
    Run {
        /// Path to the guest module (.wasm or .wat)
        #[clap(short, long)]
        module: PathBuf,

        /// Exported function to call
        #[clap(short, long, default_value = "main")]
        entry: String,

        /// i32 arguments passed to the entry point
        #[clap(short, long = "arg", allow_negative_numbers = true)]
        args: Vec<i32>,

        /// Path to a JSON configuration file
        #[clap(short, long)]
        config: Option<PathBuf>,

        /// Directory to write downloads to
        #[clap(short, long)]
        out_dir: Option<PathBuf>,

        /// Type tag given to every blob
        #[clap(long)]
        mime_type: Option<String>,

        /// Replace existing files
        #[clap(long)]
        overwrite: bool,
    },

    /// List a guest's imports and exports
    Inspect {
        /// Path to the guest module (.wasm or .wat)
        #[clap(short, long)]
        module: PathBuf,

        /// Path to a JSON configuration file
        #[clap(short, long)]
        config: Option<PathBuf>,
    },
}

fn load_config(path: Option<PathBuf>) -> anyhow::Result<RuntimeConfig> {
    match path {
        Some(path) => {
            info!("Loading configuration from {}", path.display());
            Ok(RuntimeConfig::from_file(&path)?)
        }
        None => Ok(RuntimeConfig::default()),
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    env_logger::Builder::from_env(Env::default().default_filter_or(&cli.log_level)).init();

    match cli.command {
        Commands::Run {
            module,
            entry,
            args,
            config,
            out_dir,
            mime_type,
            overwrite,
        } => {
            let mut config = load_config(config)?;
            if let Some(out_dir) = out_dir {
                config.output_dir = out_dir;
            }
            if let Some(mime_type) = mime_type {
                config.mime_type = mime_type;
            }
            config.overwrite |= overwrite;

            let platform = DirectorySavePlatform::new(&config.output_dir, config.overwrite)?;
            let runtime = WasmRuntime::new(&module, config)?;

            info!("Running `{}` from {}", entry, module.display());
            let report = match runtime.run(platform, &entry, &args) {
                Ok(report) => report,
                Err(e) => {
                    error!("Guest run failed: {}", e);
                    return Err(e.into());
                }
            };

            for path in report.platform.saved_files() {
                println!("{}", path.display());
            }
            if let Some(code) = report.results.first().filter(|&&code| code < 0) {
                warn!("`{}` returned {}", entry, code);
            }
            info!(
                "Saved {} file(s) to {}",
                report.receipts.len(),
                report.platform.output_dir().display()
            );
        }
        Commands::Inspect { module, config } => {
            let config = load_config(config)?;
            let runtime = WasmRuntime::new(&module, config)?;
            let info = runtime.inspect();

            println!("imports:");
            for import in &info.imports {
                println!("  {}", import);
            }
            println!("exports:");
            for export in &info.exports {
                println!("  {}", export);
            }
            match info.download_import {
                DownloadImport::Valid => println!("download import: ok"),
                DownloadImport::Missing => println!("download import: not imported"),
                DownloadImport::Mismatched(ty) => {
                    println!("download import: unexpected type {}", ty)
                }
            }
        }
    }

    Ok(())
}
