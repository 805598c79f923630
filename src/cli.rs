//! # Command Line Interface
//!
//! The binary has no subcommands: invoking it runs the provisioning pipeline
//! once. The flags only adjust environment loading and log verbosity.

use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "credplane")]
#[command(about = "Provision a randomized MySQL credential into AWS Secrets Manager and Kubernetes Secrets")]
#[command(version = env!("CARGO_PKG_VERSION"))]
pub struct Cli {
    /// Dotenv file loaded before configuration parsing (defaults to ./.env
    /// when present)
    #[arg(long)]
    pub env_file: Option<PathBuf>,

    /// Enable verbose (debug) logging
    #[arg(short, long)]
    pub verbose: bool,
}

impl Cli {
    /// Load environment variables from the configured dotenv file. A missing
    /// default `.env` is fine; an explicitly named file must exist.
    pub fn load_env_file(&self) -> anyhow::Result<()> {
        match &self.env_file {
            Some(path) => {
                dotenvy::from_path(path)
                    .with_context(|| format!("failed to load env file {}", path.display()))?;
            }
            None => {
                if let Err(error) = dotenvy::dotenv() {
                    if !error.not_found() {
                        eprintln!("Warning: error loading .env file: {}", error);
                    }
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parses_defaults() {
        let cli = Cli::parse_from(["credplane"]);
        assert!(cli.env_file.is_none());
        assert!(!cli.verbose);
    }

    #[test]
    fn test_cli_parses_flags() {
        let cli = Cli::parse_from(["credplane", "--env-file", "/tmp/test.env", "--verbose"]);
        assert_eq!(cli.env_file, Some(PathBuf::from("/tmp/test.env")));
        assert!(cli.verbose);
    }

    #[test]
    fn test_missing_explicit_env_file_is_an_error() {
        let cli = Cli::parse_from(["credplane", "--env-file", "/nonexistent/path.env"]);
        assert!(cli.load_env_file().is_err());
    }
}
