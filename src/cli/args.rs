use clap::{Parser, Subcommand};

/// s3device - list and clean up prefixes on S3-compatible storage
#[derive(Parser, Debug)]
#[command(name = "s3device")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Config file path (falls back to environment variables)
    #[arg(long, global = true, env = "S3DEVICE_CONFIG")]
    pub config: Option<String>,

    /// Profile to use from config
    #[arg(long, global = true, env = "S3DEVICE_PROFILE")]
    pub profile: Option<String>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, global = true, default_value = "warn")]
    pub log_level: String,

    /// Disable SSL certificate verification
    #[arg(long, global = true)]
    pub insecure: bool,

    /// Output format (text, json)
    #[arg(long, global = true, value_enum, default_value = "text")]
    pub format: OutputFormat,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List every object under a prefix
    Ls {
        /// Prefix below the profile root (empty lists everything)
        #[arg(value_name = "PREFIX", default_value = "")]
        prefix: String,

        /// Page size for ListObjectsV2 requests
        #[arg(long)]
        max_keys: Option<i32>,

        /// Show human-readable sizes
        #[arg(short = 'H', long)]
        human_readable: bool,
    },

    /// Delete every object under a prefix
    Rm {
        /// Prefix below the profile root
        #[arg(value_name = "PREFIX")]
        prefix: String,

        /// Treat PREFIX as a single object key
        #[arg(long)]
        key: bool,
    },

    /// Write an object's contents to stdout
    Cat {
        /// Object key below the profile root
        #[arg(value_name = "KEY")]
        key: String,
    },

    /// Create the profile bucket with the profile ACL
    Mb,
}

impl Cli {
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_ls_defaults() {
        let cli = Cli::try_parse_from(["s3device", "ls"]).unwrap();
        assert_eq!(cli.format, OutputFormat::Text);
        assert_eq!(cli.log_level, "warn");
        match cli.command {
            Commands::Ls { prefix, max_keys, human_readable } => {
                assert_eq!(prefix, "");
                assert_eq!(max_keys, None);
                assert!(!human_readable);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_parse_rm_with_globals() {
        let cli = Cli::try_parse_from([
            "s3device",
            "rm",
            "photos/2023/",
            "--profile",
            "minio",
            "--format",
            "json",
        ])
        .unwrap();
        assert_eq!(cli.profile.as_deref(), Some("minio"));
        assert_eq!(cli.format, OutputFormat::Json);
        assert!(matches!(cli.command, Commands::Rm { ref prefix, key: false } if prefix == "photos/2023/"));
    }

    #[test]
    fn test_rm_requires_prefix() {
        assert!(Cli::try_parse_from(["s3device", "rm"]).is_err());
    }
}
