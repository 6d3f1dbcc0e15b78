use anyhow::{Context, Result};
use futures::TryStreamExt;
use serde::Serialize;
use std::io::Write;
use tracing::info;

use crate::cli::args::OutputFormat;
use crate::s3::{HyperTransport, S3Client, S3Object, Transport};

/// Outcome of an `rm` invocation
#[derive(Debug, Serialize)]
struct RemoveSummary<'a> {
    prefix: &'a str,
    complete: bool,
}

/// CLI Handler - executes CLI commands against one storage profile
pub struct CLIHandler<T = HyperTransport> {
    client: S3Client<T>,
    format: OutputFormat,
}

impl<T: Transport + Clone> CLIHandler<T> {
    pub fn new(client: S3Client<T>, format: OutputFormat) -> Self {
        Self { client, format }
    }

    pub fn client(&self) -> &S3Client<T> {
        &self.client
    }

    /// Execute ls command - stream every object under `prefix`
    pub async fn execute_ls<W: Write>(
        &self,
        out: &mut W,
        prefix: &str,
        max_keys: Option<i32>,
        human_readable: bool,
    ) -> Result<usize> {
        let client = match max_keys {
            Some(max_keys) => self.client.clone().with_page_size(max_keys)?,
            None => self.client.clone(),
        };

        let mut objects = Box::pin(client.list_all(prefix));
        let mut count = 0usize;
        let mut collected: Vec<S3Object> = Vec::new();

        while let Some(obj) = objects.try_next().await.context("Failed to list objects")? {
            count += 1;
            match self.format {
                OutputFormat::Text => {
                    writeln!(
                        out,
                        "{} {:>10} {}",
                        obj.last_modified.as_deref().unwrap_or("-"),
                        format_size(obj.size, human_readable),
                        obj.key
                    )?;
                }
                OutputFormat::Json => collected.push(obj),
            }
        }

        if self.format == OutputFormat::Json {
            writeln!(out, "{}", serde_json::to_string_pretty(&collected)?)?;
        }

        info!(prefix, count, "listing complete");
        Ok(count)
    }

    /// Execute rm command - delete a prefix, or a single key
    pub async fn execute_rm<W: Write>(&self, out: &mut W, prefix: &str, single_key: bool) -> Result<bool> {
        let complete = if single_key {
            self.client
                .delete_object(prefix)
                .await
                .with_context(|| format!("Failed to delete object {}", prefix))?;
            true
        } else {
            self.client
                .delete_path(prefix)
                .await
                .with_context(|| format!("Failed to delete prefix {}", prefix))?
        };

        match self.format {
            OutputFormat::Text if complete => writeln!(out, "Removed {}", prefix)?,
            OutputFormat::Text => writeln!(out, "Removed {} with some objects refused", prefix)?,
            OutputFormat::Json => writeln!(
                out,
                "{}",
                serde_json::to_string(&RemoveSummary { prefix, complete })?
            )?,
        }
        Ok(complete)
    }

    /// Execute cat command - copy object bytes to `out`
    pub async fn execute_cat<W: Write>(&self, out: &mut W, key: &str) -> Result<()> {
        let body = self
            .client
            .get_object(key)
            .await
            .with_context(|| format!("Failed to read object {}", key))?;
        out.write_all(&body)?;
        out.flush()?;
        Ok(())
    }

    /// Execute mb command - create the configured bucket
    pub async fn execute_mb<W: Write>(&self, out: &mut W) -> Result<()> {
        let config = self.client.config();
        self.client
            .create_bucket()
            .await
            .with_context(|| format!("Failed to create bucket {}", config.bucket()))?;
        writeln!(
            out,
            "Bucket created successfully `{}` ({})",
            config.bucket(),
            config.acl().as_header_value()
        )?;
        Ok(())
    }
}

fn format_size(bytes: u64, human_readable: bool) -> String {
    if human_readable {
        format_bytes(bytes)
    } else {
        bytes.to_string()
    }
}

/// Format bytes as human-readable string
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KiB", "MiB", "GiB", "TiB", "PiB"];

    if bytes == 0 {
        return "0B".to_string();
    }

    let bytes_f64 = bytes as f64;
    let exponent = (bytes_f64.ln() / 1024_f64.ln()).floor() as usize;
    let exponent = exponent.min(UNITS.len() - 1);

    let value = bytes_f64 / 1024_f64.powi(exponent as i32);

    if exponent == 0 {
        format!("{}{}", bytes, UNITS[exponent])
    } else {
        format!("{:.1}{}", value, UNITS[exponent])
    }
}
