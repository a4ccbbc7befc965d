use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use serde_json::json;

use ip_deny_gate::config::load_config;
use ip_deny_gate::http::DenyListPolicy;
use ip_deny_gate::security::resolve;

#[derive(Parser)]
#[command(name = "gate-cli")]
#[command(about = "Offline checks for an ip-deny-gate configuration", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "deny-gate.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate the configuration and summarize the deny list
    Validate,
    /// Show the decision for a peer address and proxy-chain header
    Check {
        /// Peer address as seen by the listener (e.g. 203.0.113.50:8080)
        #[arg(long)]
        peer: String,

        /// Raw proxy-chain header value
        #[arg(long)]
        forwarded_for: Option<String>,
    },
}

fn main() -> Result<ExitCode, Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()),
        )
        .init();

    let config = load_config(&cli.config)?;
    let policy = DenyListPolicy::from_config(&config.deny_list)?;

    match cli.command {
        Commands::Validate => {
            let set = policy.gate.address_set();
            let summary = json!({
                "valid": true,
                "literals": set.literal_count(),
                "ranges": set.range_count(),
                "forwarded_header": policy.header.as_str(),
            });
            println!("{}", serde_json::to_string_pretty(&summary)?);
            Ok(ExitCode::SUCCESS)
        }
        Commands::Check { peer, forwarded_for } => {
            let candidates = resolve(forwarded_for.as_deref(), &peer);
            let decision = policy.gate.decide(&candidates);
            let report = json!({
                "candidates": candidates,
                "result": decision,
            });
            println!("{}", serde_json::to_string_pretty(&report)?);

            if decision.is_denied() {
                Ok(ExitCode::from(2))
            } else {
                Ok(ExitCode::SUCCESS)
            }
        }
    }
}
