//! Local driver for the `ScrapeConfig` data sources

use std::{
    io::{self, Read},
    path::{Path, PathBuf},
    process::ExitCode,
};

use anyhow::Context as _;
use clap::{Parser, Subcommand, ValueEnum};
use scrapeconfig_provider::{
    Provider, ProviderConfig, Result, ScrapeConfigDataSource, ScrapeConfigManifest, telemetry,
};
use serde_json::{Value, json};
use tracing::{error, instrument};

#[derive(Parser, Debug)]
#[command(version, about = "Reads and renders Prometheus Operator ScrapeConfig objects")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the attribute tree of a data source as JSON
    Schema {
        #[arg(value_enum)]
        kind: Kind,
    },
    /// Read a ScrapeConfig from the cluster and print its state
    Read {
        #[arg(long)]
        name: String,
        #[arg(long, short)]
        namespace: String,
        /// Path of the kubeconfig file, `KUBECONFIG` and the in-cluster config are used when unset
        #[arg(long)]
        kubeconfig: Option<PathBuf>,
        /// Kubeconfig context
        #[arg(long)]
        context: Option<String>,
    },
    /// Render a manifest from a JSON configuration file, `-` reads stdin
    Render { file: PathBuf },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum Kind {
    DataSource,
    Manifest,
}

fn read_config(file: &Path) -> anyhow::Result<Value> {
    let text = if file.as_os_str() == "-" {
        let mut text = String::new();
        io::stdin().read_to_string(&mut text)?;
        text
    } else {
        std::fs::read_to_string(file).with_context(|| format!("reading {}", file.display()))?
    };
    serde_json::from_str(&text).with_context(|| format!("parsing {}", file.display()))
}

async fn read_scrape_config(name: &str, namespace: &str, config: &ProviderConfig) -> Result<Value> {
    let mut provider = Provider::new();
    provider.configure(config).await?;
    provider
        .scrape_config_data_source()?
        .read(&json!({"metadata": {"name": name, "namespace": namespace}}))
        .await
}

#[instrument(level = "info", target = "provider::main", name = "run", skip(command))]
async fn run(command: Command) -> anyhow::Result<Result<Value>> {
    let outcome = match command {
        Command::Schema { kind } => {
            let schema = match kind {
                Kind::DataSource => ScrapeConfigDataSource::schema(),
                Kind::Manifest => ScrapeConfigManifest::schema(),
            };
            Ok(serde_json::to_value(schema)?)
        }
        Command::Read {
            name,
            namespace,
            kubeconfig,
            context,
        } => read_scrape_config(&name, &namespace, &ProviderConfig { kubeconfig, context }).await,
        Command::Render { file } => {
            let config = read_config(&file)?;
            Provider::new().scrape_config_manifest().read(&config)
        }
    };
    Ok(outcome)
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let _telemetry = telemetry::init()?;
    let cli = Cli::parse();

    match run(cli.command).await? {
        Ok(state) => {
            println!("{}", serde_json::to_string_pretty(&state)?);
            Ok(ExitCode::SUCCESS)
        }
        Err(err) => {
            error!(error = %err, "operation failed");
            println!("{}", serde_json::to_string_pretty(&err.into_diagnostics())?);
            Ok(ExitCode::FAILURE)
        }
    }
}
