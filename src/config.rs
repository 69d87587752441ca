use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;

use crate::provider::bedrock::DEFAULT_AWS_REGION;

const DEFAULT_PROMPTS_DIR: &str = "~/.latbench/prompts";

/// latbench - latency benchmark for hosted LLM endpoints
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct CliArgs {
    /// Calls per evaluation (defaults to one call per prompt)
    #[arg(short = 'n', long = "samples", env = "SAMPLE_SIZE")]
    pub sample_size: Option<usize>,

    /// Seed for random prompt sampling
    #[arg(long, env = "SAMPLE_SEED")]
    pub seed: Option<u64>,

    /// Directory with user `*.prompt` files
    #[arg(long, env = "PROMPTS_DIR", default_value = DEFAULT_PROMPTS_DIR)]
    pub prompts_dir: String,

    /// Only show models whose name contains this text
    #[arg(short = 'f', long = "filter", env = "MODEL_FILTER", default_value = "")]
    pub model_filter: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Also write logs to this file
    #[arg(long, env = "LOG_FILE")]
    pub log_file: Option<String>,

    /// HTTP connect timeout in seconds
    #[arg(long, env = "HTTP_CONNECT_TIMEOUT", default_value = "30")]
    pub connect_timeout: u64,

    /// Idle connections kept per host
    #[arg(long, env = "HTTP_MAX_CONNECTIONS", default_value = "20")]
    pub max_connections: usize,

    /// OpenAI API key
    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    pub openai_api_key: Option<String>,

    /// Groq API key
    #[arg(long, env = "GROQ_API_KEY", hide_env_values = true)]
    pub groq_api_key: Option<String>,

    /// Bedrock API key
    #[arg(long, env = "AWS_BEARER_TOKEN_BEDROCK", hide_env_values = true)]
    pub bedrock_api_key: Option<String>,

    /// AWS region for Bedrock
    #[arg(long, env = "AWS_REGION", default_value = DEFAULT_AWS_REGION)]
    pub aws_region: String,
}

#[derive(Clone, Debug)]
pub struct Config {
    // Sampling
    pub sample_size: Option<usize>,
    pub sample_seed: Option<u64>,
    pub prompts_dir: PathBuf,
    pub model_filter: String,

    // Credentials
    pub openai_api_key: Option<String>,
    pub groq_api_key: Option<String>,
    pub bedrock_api_key: Option<String>,
    pub aws_region: String,

    // HTTP client
    pub http_max_connections: usize,
    pub http_connect_timeout: u64,

    // Logging
    pub log_level: String,
    pub log_file: Option<PathBuf>,
}

impl Config {
    /// Load configuration from all sources with priority: CLI > ENV > defaults
    pub fn load() -> Result<Self> {
        // Load .env file if it exists
        dotenvy::dotenv().ok();

        let args = CliArgs::parse();
        let config = Self::from_args(args);
        config.validate().context("Invalid configuration")?;

        Ok(config)
    }

    pub fn from_args(args: CliArgs) -> Self {
        Config {
            sample_size: args.sample_size,
            sample_seed: args.seed,
            prompts_dir: expand_tilde(&args.prompts_dir),
            model_filter: args.model_filter,

            openai_api_key: non_empty(args.openai_api_key),
            groq_api_key: non_empty(args.groq_api_key),
            bedrock_api_key: non_empty(args.bedrock_api_key),
            aws_region: args.aws_region,

            http_max_connections: args.max_connections,
            http_connect_timeout: args.connect_timeout,

            log_level: args.log_level,
            log_file: args.log_file.map(|s| expand_tilde(&s)),
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        // A missing prompts dir is fine, the defaults are used
        if self.prompts_dir.exists() && !self.prompts_dir.is_dir() {
            anyhow::bail!(
                "PROMPTS_DIR is not a directory: {}",
                self.prompts_dir.display()
            );
        }

        if self.aws_region.trim().is_empty() {
            anyhow::bail!("AWS_REGION must not be empty");
        }

        Ok(())
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Expand tilde (~) in file paths to user's home directory
fn expand_tilde(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    PathBuf::from(path)
}
