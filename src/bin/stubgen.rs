// src/bin/stubgen.rs

use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::EnvFilter;

use stubgen::cli::{Cli, Commands};
use stubgen::commands::check::check_files;
use stubgen::commands::generate::generate;
use stubgen::commands::version::print_version;

fn main() -> ExitCode {
    init_tracing();

    let cli = Cli::parse();
    match cli.command {
        Commands::Generate(args) => generate(&args, cli.color),
        Commands::Check { paths } => check_files(&paths, cli.color),
        Commands::Version => print_version(),
    }
}

/// Logging is opt-in: set STUBGEN_LOG to an EnvFilter spec (`debug`,
/// `stubgen::sema=trace`, ...) and lines go to stderr. The default
/// format is bare; STUBGEN_LOG_STYLE=full adds timestamps and span
/// open/close events for timing the pipeline phases.
fn init_tracing() {
    let Ok(filter) = EnvFilter::try_from_env("STUBGEN_LOG") else {
        return;
    };
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_level(true)
        .with_writer(std::io::stderr);

    let full = std::env::var("STUBGEN_LOG_STYLE").is_ok_and(|style| style == "full");
    if full {
        builder
            .with_span_events(FmtSpan::NEW | FmtSpan::CLOSE)
            .init();
    } else {
        builder.without_time().init();
    }
    tracing::debug!("tracing initialized");
}
