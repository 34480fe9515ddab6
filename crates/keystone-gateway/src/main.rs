//! Keystone attestation CLI
//!
//! - Verify: check every signature in an attestation export
//! - Inspect: list the attestations an export contains

use anyhow::Context;
use clap::{Parser, Subcommand};
use keystone_gateway::{inspect_export_file, verify_export_file};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "keystone-attest")]
#[command(about = "Keystone attestation export verification and inspection tool")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Verify the signatures in an attestation export
    Verify {
        /// Path to the export JSON file
        file: String,
    },
    /// Inspect an attestation export
    Inspect {
        /// Path to the export JSON file
        file: String,
        /// Print the inspection as JSON
        #[arg(long)]
        json: bool,
    },
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Verify { file } => {
            let result = verify_export_file(&file).with_context(|| format!("reading {}", file))?;

            println!("╔══════════════════════════════════════════════════════════╗");
            println!("║            Attestation Export Verification               ║");
            println!("╚══════════════════════════════════════════════════════════╝");
            println!();

            if result.valid {
                println!("✓ Export is VALID");
            } else {
                println!("✗ Export is INVALID");
            }

            println!();
            println!("Attestations: {}", result.attestation_count);
            println!("Signer:       {}...", &result.signer[..16.min(result.signer.len())]);

            if !result.errors.is_empty() {
                println!();
                println!("Errors:");
                for error in &result.errors {
                    println!("  - {}", error);
                }
            }

            if !result.valid {
                std::process::exit(1);
            }
        }
        Commands::Inspect { file, json } => {
            let inspection = inspect_export_file(&file).with_context(|| format!("reading {}", file))?;

            if json {
                println!("{}", serde_json::to_string_pretty(&inspection)?);
                return Ok(());
            }

            println!("╔══════════════════════════════════════════════════════════╗");
            println!("║               Attestation Export Inspection              ║");
            println!("╚══════════════════════════════════════════════════════════╝");
            println!();
            println!("Version:      {}", inspection.version);
            println!("Exported At:  {}", inspection.exported_at);
            println!("Signer Key:   {}", inspection.signer_public_key);
            println!("Attestations: {}", inspection.attestations.len());
            println!();

            for a in &inspection.attestations {
                println!(
                    "{} {}  exec={}  tier={}  outcome={}  scopes={}",
                    if a.signature_valid { "✓" } else { "✗" },
                    a.attestation_id,
                    a.execution_id,
                    a.risk_tier,
                    a.outcome,
                    a.scope_count
                );
            }
        }
    }

    Ok(())
}
