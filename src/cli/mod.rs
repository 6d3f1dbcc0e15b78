//! Command-line front end for s3device
//!
//! ```bash
//! # List everything under a prefix
//! s3device ls photos/2023/ --profile minio
//!
//! # Delete a prefix
//! s3device rm photos/2023/
//!
//! # Print one object
//! s3device cat photos/2023/index.json --format json
//!
//! # Create the profile bucket
//! s3device mb
//! ```

pub mod args;
pub mod handler;

use anyhow::{Context, Result};
use std::io::Write;
use tracing::debug;

use crate::config;
use crate::s3::S3Client;
use args::{Cli, Commands};
use handler::CLIHandler;

/// Run a parsed command line to completion
pub async fn run(cli: Cli) -> Result<()> {
    debug!("CLI arguments: {:?}", cli);

    let mut config = config::load_config(cli.config.as_deref(), cli.profile.as_deref())
        .context("Failed to load configuration")?;
    if cli.insecure {
        config.client.insecure_tls = true;
    }

    let endpoint = config.endpoint(cli.profile.as_deref())?;
    let client = S3Client::new(endpoint, &config.client).context("Failed to create S3 client")?;
    debug!(device = client.name(), bucket = client.config().bucket(), "client ready");

    let handler = CLIHandler::new(client, cli.format);
    let stdout = std::io::stdout();
    let mut out = stdout.lock();

    match cli.command {
        Commands::Ls {
            prefix,
            max_keys,
            human_readable,
        } => {
            handler
                .execute_ls(&mut out, &prefix, max_keys, human_readable)
                .await?;
        }
        Commands::Rm { prefix, key } => {
            if !handler.execute_rm(&mut out, &prefix, key).await? {
                out.flush()?;
                anyhow::bail!("Some objects under {} could not be deleted", prefix);
            }
        }
        Commands::Cat { key } => {
            handler.execute_cat(&mut out, &key).await?;
        }
        Commands::Mb => {
            handler.execute_mb(&mut out).await?;
        }
    }

    Ok(())
}
