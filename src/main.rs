use log::{debug, info};
use std::io;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use gpio_unexport::{DEFAULT_SYSFS_ROOT, GpioUnexporter, Reporter, SysfsPaths};

#[derive(Parser, Debug)]
#[command(name = "gpio-unexport")]
#[command(version)]
#[command(about = "Unexport GPIOs from sysfs based on gpio2mqtt config")]
#[command(long_about = None)]
struct Args {
    /// Path to gpio2mqtt configuration file
    config: PathBuf,

    /// Show what would be done without actually unexporting
    #[arg(short = 'n', long)]
    dry_run: bool,

    /// Show detailed information
    #[arg(short, long)]
    verbose: bool,

    /// Mount point of sysfs
    #[arg(long, value_name = "DIR", default_value = DEFAULT_SYSFS_ROOT)]
    sysfs_root: PathBuf,
}

fn main() -> ExitCode {
    let args = Args::parse();

    let default_filter = if args.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();
    debug!("{args:?}");

    let mut unexporter =
        GpioUnexporter::new(SysfsPaths::with_root(&args.sysfs_root)).dry_run(args.dry_run);
    let mut reporter = Reporter::new(io::stdout().lock()).verbose(args.verbose);

    match unexporter.run_from_file(&args.config, &mut reporter) {
        Ok(summary) => {
            info!(
                "done: {} unexported, {} skipped, {} unresolved, {} errors",
                summary.unexported, summary.skipped, summary.unresolved, summary.errors
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}
