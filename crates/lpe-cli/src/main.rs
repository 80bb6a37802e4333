//! # lpe CLI Entry Point
//!
//! Assembles subcommands and dispatches to handler modules.

use clap::Parser;

use lpe_cli::config::Config;

/// License policy engine: evaluate license rules, drive license lifecycle
/// transitions, and issue or verify offline activation codes.
#[derive(Parser, Debug)]
#[command(name = "lpe", version, about)]
struct Cli {
    /// Log filter directive. Overrides `LPE_LOG`.
    #[arg(long, global = true)]
    log: Option<String>,
    /// Emit logs as JSON. Overrides `LPE_LOG_FORMAT`.
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Evaluate rules against licenses.
    Evaluate(lpe_cli::evaluate::EvaluateArgs),
    /// Apply a lifecycle command to one license.
    Transition(lpe_cli::transition::TransitionArgs),
    /// Record one use of a license.
    Use(lpe_cli::account::UseArgs),
    /// Move a license to another organization pool.
    Transfer(lpe_cli::account::TransferArgs),
    /// Issue an offline activation code.
    Encode(lpe_cli::activation::EncodeArgs),
    /// Verify an offline activation code.
    Decode(lpe_cli::activation::DecodeArgs),
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = Config::from_env()?;
    if let Some(filter) = cli.log {
        config.log_filter = filter;
    }
    if cli.log_json {
        config.log_format = lpe_cli::config::LogFormat::Json;
    }
    config.init_tracing();

    let mut stdout = std::io::stdout().lock();
    match &cli.command {
        Commands::Evaluate(args) => lpe_cli::evaluate::run(args, &config, &mut stdout),
        Commands::Transition(args) => lpe_cli::transition::run(args, &config, &mut stdout),
        Commands::Use(args) => lpe_cli::account::use_license(args, &config, &mut stdout),
        Commands::Transfer(args) => lpe_cli::account::transfer(args, &config, &mut stdout),
        Commands::Encode(args) => lpe_cli::activation::encode(args, &config, &mut stdout),
        Commands::Decode(args) => lpe_cli::activation::decode(args, &config, &mut stdout),
    }
}
