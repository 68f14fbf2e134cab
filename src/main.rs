use clap::Parser;
use flightprint::{config::Config, survey};
use std::path::PathBuf;

#[derive(Parser)]
#[command(version, about, long_about = None)]
struct Args {
    /// Directory to scan for drone photos.
    #[arg(default_value = ".")]
    directory: PathBuf,
}

fn main() {
    // Register an event subscriber that prints events to STDOUT.
    let subscriber = tracing_subscriber::FmtSubscriber::new();
    tracing::subscriber::set_global_default(subscriber).unwrap();

    let args = Args::parse();
    let summary = survey::run(&args.directory, &Config::default());

    println!(
        "folders={} jpg_files={} jpg_err={}",
        summary.folders, summary.jpg_files, summary.jpg_err
    );
}
