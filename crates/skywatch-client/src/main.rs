//! `skywatch`: push captured observations to a Skywatch server.
//!
//! # Usage
//!
//! ```
//! skywatch --url http://localhost:8080 push captures/*.json
//! skywatch --config ~/.config/skywatch/client.toml region 1 42
//! skywatch freshness --galaxy 1
//! ```

use std::{path::PathBuf, time::Duration};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Deserialize;
use skywatch_client::{ApiClient, ApiConfig, SubmittedSet, extract::JsonExtractor, sync};
use skywatch_core::extract::ObservationExtractor as _;
use tracing::{info, level_filters::LevelFilter};
use tracing_subscriber::EnvFilter;

// ─── CLI args ─────────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "skywatch", about = "Push observations to a Skywatch server")]
struct Args {
  /// Path to a TOML config file (url, submitted, max_retries).
  #[arg(short, long, value_name = "FILE")]
  config: Option<PathBuf>,

  /// Base URL of the skywatch server (default: http://localhost:8080).
  #[arg(long, env = "SKYWATCH_URL")]
  url: Option<String>,

  /// File holding the keys of already-acknowledged reports.
  #[arg(long, env = "SKYWATCH_SUBMITTED", value_name = "FILE")]
  submitted: Option<PathBuf>,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
  /// Extract observations from JSON documents and submit them.
  Push {
    #[arg(required = true)]
    files: Vec<PathBuf>,
  },
  /// Show the canonical bodies of one system.
  Region { galaxy: u16, system: u16 },
  /// List region freshness.
  Freshness {
    #[arg(long)]
    galaxy: Option<u16>,
  },
}

// ─── Config file ──────────────────────────────────────────────────────────────

/// Shape of the optional TOML config file.
#[derive(Deserialize, Default)]
struct ConfigFile {
  #[serde(default)]
  url:            String,
  #[serde(default)]
  submitted:      Option<PathBuf>,
  #[serde(default)]
  max_retries:    Option<u32>,
  #[serde(default)]
  retry_delay_ms: Option<u64>,
}

// ─── Entry point ──────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .with_writer(std::io::stderr)
    .init();

  let args = Args::parse();

  let file_cfg: ConfigFile = if let Some(path) = &args.config {
    let raw = std::fs::read_to_string(path)
      .with_context(|| format!("reading config file {}", path.display()))?;
    toml::from_str(&raw).context("parsing config file")?
  } else {
    ConfigFile::default()
  };

  // CLI flags override config file, which overrides defaults.
  let mut api_config = ApiConfig::new(
    args
      .url
      .or_else(|| (!file_cfg.url.is_empty()).then(|| file_cfg.url.clone()))
      .unwrap_or_else(|| "http://localhost:8080".to_string()),
  );
  if let Some(retries) = file_cfg.max_retries {
    api_config.max_retries = retries;
  }
  if let Some(ms) = file_cfg.retry_delay_ms {
    api_config.retry_delay = Duration::from_millis(ms);
  }
  let submitted_path = args
    .submitted
    .or(file_cfg.submitted)
    .unwrap_or_else(|| PathBuf::from("skywatch-submitted.json"));

  let client = ApiClient::new(api_config)?;

  match args.command {
    Command::Push { files } => {
      let mut observations = Vec::new();
      for path in &files {
        let raw = std::fs::read_to_string(path)
          .with_context(|| format!("reading {}", path.display()))?;
        let found = JsonExtractor
          .extract(&raw)
          .with_context(|| format!("extracting observations from {}", path.display()))?;
        info!(file = %path.display(), count = found.len(), "extracted observations");
        observations.extend(found);
      }

      let mut submitted = SubmittedSet::load(&submitted_path)
        .with_context(|| format!("loading {}", submitted_path.display()))?;
      let summary = sync(&client, &observations, &mut submitted).await;
      submitted
        .save(&submitted_path)
        .with_context(|| format!("saving {}", submitted_path.display()))?;

      println!("{}", serde_json::to_string_pretty(&summary)?);
      if !summary.errors.is_empty() {
        anyhow::bail!("{} observation(s) could not be submitted", summary.errors.len());
      }
    }
    Command::Region { galaxy, system } => {
      let state = client.region_state(galaxy, system).await?;
      println!("{}", serde_json::to_string_pretty(&state)?);
    }
    Command::Freshness { galaxy } => {
      let rows = client.freshness(galaxy).await?;
      println!("{}", serde_json::to_string_pretty(&rows)?);
    }
  }

  Ok(())
}
