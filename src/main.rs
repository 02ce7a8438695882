use std::env;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use facegate::service::{Capabilities, FaceAuth};
use facegate::{config, probe};
use log::info;

#[derive(Parser)]
#[command(name = "facegate")]
#[command(version, about = "Face enrollment and login matching for the employee directory")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Enroll an identity from one or more face images
    Enroll {
        /// Identity key to enroll under
        #[arg(short, long)]
        identity: String,
        /// Image files, processed in order
        #[arg(required = true)]
        images: Vec<PathBuf>,
    },
    /// Match a probe image against all enrolled identities
    Identify {
        /// Probe image file
        #[arg(conflicts_with = "base64")]
        image: Option<PathBuf>,
        /// Base64 probe payload (optionally a data: URL), as the web client sends it
        #[arg(long)]
        base64: Option<String>,
    },
    /// List enrolled identities
    List,
    /// Remove the stored encoding for an identity
    Purge {
        #[arg(short, long)]
        identity: String,
    },
    /// Report which pipelines are usable with the installed models
    Doctor,
    /// Open config file in editor
    Config,
}

fn main() -> Result<()> {
    env_logger::builder()
        .filter_level(log::LevelFilter::Info)
        .format_target(false)
        .format_timestamp(None)
        .init();

    let cli = Cli::parse();
    let cfg = config::load_config(None)?;

    match cli.command {
        Commands::Enroll { identity, images } => {
            let mut service = FaceAuth::open(&cfg)?;
            let mut batch = Vec::with_capacity(images.len());
            for path in &images {
                batch.push(probe::load_probe(path)?);
            }
            let report = service.enroll(&identity, &batch)?;
            println!("{}", serde_json::to_string_pretty(&report)?);
            Ok(())
        }
        Commands::Identify { image, base64 } => {
            let mut service = FaceAuth::open(&cfg)?;
            let result = match probe_source(image, base64)? {
                ProbeSource::File(path) => {
                    let img = probe::load_probe(&path)?;
                    service.identify(&img)?
                }
                ProbeSource::Base64(payload) => service.identify_base64(&payload)?,
            };
            println!("{}", serde_json::to_string_pretty(&result)?);
            if !result.outcome.is_match() {
                std::process::exit(1);
            }
            Ok(())
        }
        Commands::List => {
            let service = FaceAuth::open(&cfg)?;
            for identity in service.identities()? {
                println!("{identity}");
            }
            Ok(())
        }
        Commands::Purge { identity } => {
            let service = FaceAuth::open(&cfg)?;
            if service.purge(&identity)? {
                info!("✓ Encoding purged for identity: {}", identity);
            } else {
                info!("No stored encoding for identity: {}", identity);
            }
            Ok(())
        }
        Commands::Doctor => {
            let caps = Capabilities::probe(&cfg);
            println!("{}", serde_json::to_string_pretty(&caps)?);
            Ok(())
        }
        Commands::Config => open_config(),
    }
}

#[derive(Debug)]
enum ProbeSource {
    File(PathBuf),
    Base64(String),
}

fn probe_source(image: Option<PathBuf>, base64: Option<String>) -> Result<ProbeSource> {
    match (image, base64) {
        (Some(path), None) => Ok(ProbeSource::File(path)),
        (None, Some(payload)) => Ok(ProbeSource::Base64(payload)),
        (Some(_), Some(_)) => anyhow::bail!("provide an image path or --base64, not both"),
        (None, None) => anyhow::bail!("provide an image path or --base64"),
    }
}

fn open_config() -> Result<()> {
    let config_path = config::CONFIG_PATH.as_os_str();
    let editor = env::var("EDITOR").unwrap_or_else(|_| "vi".to_string());

    info!("Opening config file: {:?}", config_path);

    let status = std::process::Command::new(editor)
        .arg(config_path)
        .status()
        .context("Failed to open editor")?;

    if !status.success() {
        anyhow::bail!("Editor exited with non-zero status");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn probe_source_prefers_whichever_input_is_given() {
        assert!(matches!(
            probe_source(Some(PathBuf::from("face.png")), None),
            Ok(ProbeSource::File(_))
        ));
        assert!(matches!(
            probe_source(None, Some("aGVsbG8=".into())),
            Ok(ProbeSource::Base64(_))
        ));
    }

    #[test]
    fn probe_source_errors_name_the_missing_or_duplicate_input() {
        let neither = probe_source(None, None).unwrap_err();
        assert_eq!(neither.to_string(), "provide an image path or --base64");

        let both = probe_source(Some(PathBuf::from("face.png")), Some("x".into())).unwrap_err();
        assert_eq!(both.to_string(), "provide an image path or --base64, not both");
    }
}
