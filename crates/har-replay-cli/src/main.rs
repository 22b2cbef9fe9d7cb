//! har-replay — entry point: HAR capture in, Python requests script out.

use std::io::Read;
use std::path::PathBuf;

use clap::Parser;

use har_replay::AnalysisConfig;
use har_replay_cli::emit::{emit_python, EmitOptions};

#[derive(Parser)]
#[command(
    name = "har-replay",
    about = "Convert a captured HAR session into a minimal Python requests script",
    version
)]
struct Cli {
    /// HAR capture to analyze ("-" reads stdin).
    input: String,

    /// Collect schema deviations as warnings instead of failing.
    #[arg(long)]
    lenient: bool,

    /// Skip value-origin inference (every value becomes a literal).
    #[arg(long)]
    no_infer: bool,

    /// Keep OPTIONS preflight requests.
    #[arg(long)]
    include_options: bool,

    /// Keep the Cookie header out of the shared baseline.
    #[arg(long)]
    exclude_cookie_headers: bool,

    /// Emit status-code assertions after each request.
    #[arg(long)]
    assertions: bool,

    /// Append response bodies as comments.
    #[arg(long)]
    show_responses: bool,

    /// Write the script here instead of stdout.
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, default_value = "warn")]
    log_level: String,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&cli.log_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let json = if cli.input == "-" {
        let mut buf = String::new();
        std::io::stdin().read_to_string(&mut buf)?;
        buf
    } else {
        std::fs::read_to_string(&cli.input)?
    };

    let config = AnalysisConfig {
        strict: !cli.lenient,
        include_options: cli.include_options,
        infer_origins: !cli.no_infer,
        exclude_cookie_headers: cli.exclude_cookie_headers,
        ..AnalysisConfig::default()
    };

    let (session, analysis) = har_replay::analyze_har(&json, &config)?;
    for warning in &session.warnings {
        tracing::warn!(
            entry = warning.entry,
            field = %warning.field,
            "{}",
            warning.message
        );
    }

    let opts = EmitOptions {
        assertions: cli.assertions,
        show_responses: cli.show_responses,
    };
    let script = emit_python(&analysis, &session, &opts);

    match cli.output {
        Some(path) => std::fs::write(path, script)?,
        None => print!("{script}"),
    }
    Ok(())
}
