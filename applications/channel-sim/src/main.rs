/// Channel Sim - headless runner for sound channel scenarios
use channel_sim::{config::SimConfig, Simulation};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "channel-sim")]
#[command(about = "Simulate sound channel pools frame by frame", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a scenario and print its event log
    Run {
        /// Scenario file path
        scenario: PathBuf,

        /// Print the full report as JSON
        #[arg(long)]
        json: bool,
    },
    /// Validate a scenario without running it
    Check {
        /// Scenario file path
        scenario: PathBuf,
    },
}

fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "channel_sim=info,soul_channels=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run { scenario, json } => {
            let config = SimConfig::load(&scenario)?;
            let report = Simulation::new(&config)?.run()?;

            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                for entry in &report.events {
                    let name = entry
                        .name
                        .clone()
                        .unwrap_or_else(|| entry.sound.to_string());
                    println!("{:>8.1} ms  {:<16} {:?}", entry.at_ms, name, entry.event);
                }
                for step in report
                    .outcomes
                    .iter()
                    .filter(|step| step.outcome.as_deref().is_some_and(|o| o != "Applied"))
                {
                    println!(
                        "{:>8.1} ms  {:?} -> {}",
                        step.at_ms,
                        step.action,
                        step.outcome.as_deref().unwrap_or_default()
                    );
                }
            }
        }
        Commands::Check { scenario } => {
            let config = SimConfig::load(&scenario)?;
            Simulation::new(&config)?;
            println!(
                "{}: {} assets, {} sounds, {} steps",
                scenario.display(),
                config.assets.len(),
                config.sounds.len(),
                config.script.len()
            );
        }
    }

    Ok(())
}
