use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueHint, builder::BoolishValueParser};

/// Command-line arguments for the Geographer binary.
#[derive(Debug, Parser)]
#[command(
    name = "geographer",
    version,
    about = "Sanity webhook revalidation service"
)]
pub struct CliArgs {
    /// Optional path to a configuration file.
    #[arg(long = "config-file", env = "GEOGRAPHER_CONFIG_FILE", value_name = "PATH")]
    pub config_file: Option<PathBuf>,

    #[command(flatten)]
    pub sanity: SanityOverrides,

    /// Shared secret expected from the webhook sender.
    #[arg(
        long = "revalidate-secret",
        env = "SANITY_REVALIDATE_SECRET",
        value_name = "SECRET",
        hide_env_values = true
    )]
    pub revalidate_secret: Option<String>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Run the HTTP service.
    Serve(Box<ServeArgs>),
    /// Print the tags a webhook payload would invalidate.
    Resolve(ResolveArgs),
}

#[derive(Debug, Args, Default, Clone)]
pub struct SanityOverrides {
    /// Sanity project id.
    #[arg(long = "sanity-project-id", env = "SANITY_PROJECT_ID", value_name = "ID")]
    pub project_id: Option<String>,

    /// Sanity dataset name.
    #[arg(long = "sanity-dataset", env = "SANITY_DATASET", value_name = "NAME")]
    pub dataset: Option<String>,

    /// Sanity API version (`YYYY-MM-DD`).
    #[arg(
        long = "sanity-api-version",
        env = "SANITY_API_VERSION",
        value_name = "VERSION"
    )]
    pub api_version: Option<String>,

    /// Token used for authenticated reads.
    #[arg(
        long = "sanity-read-token",
        env = "SANITY_READ_TOKEN",
        value_name = "TOKEN",
        hide_env_values = true
    )]
    pub read_token: Option<String>,

    /// Toggle the Sanity CDN for cached reads.
    #[arg(
        long = "sanity-use-cdn",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new()
    )]
    pub use_cdn: Option<bool>,
}

#[derive(Debug, Args, Default, Clone)]
pub struct ServeArgs {
    #[command(flatten)]
    pub overrides: ServeOverrides,
}

#[derive(Debug, Args, Default, Clone)]
pub struct ServeOverrides {
    /// Override the listener host.
    #[arg(long = "server-host", value_name = "HOST")]
    pub server_host: Option<String>,

    /// Override the listener port.
    #[arg(long = "server-port", value_name = "PORT")]
    pub server_port: Option<u16>,

    /// Override the graceful shutdown timeout.
    #[arg(long = "server-graceful-shutdown-seconds", value_name = "SECONDS")]
    pub server_graceful_shutdown_seconds: Option<u64>,

    /// Override the base log level (trace|debug|info|warn|error).
    #[arg(long = "log-level", value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Toggle JSON logging.
    #[arg(
        long = "log-json",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new()
    )]
    pub log_json: Option<bool>,

    /// Toggle the query cache.
    #[arg(
        long = "cache-enabled",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new()
    )]
    pub cache_enabled: Option<bool>,

    /// Override the number of cached query results.
    #[arg(long = "cache-query-limit", value_name = "COUNT")]
    pub cache_query_limit: Option<usize>,
}

#[derive(Debug, Args, Clone)]
pub struct ResolveArgs {
    /// Webhook payload to resolve; `-` reads stdin.
    #[arg(value_name = "FILE", value_hint = ValueHint::FilePath)]
    pub file: PathBuf,

    /// Skip reference lookups; releases resolve to their own tags only.
    #[arg(long, action = clap::ArgAction::SetTrue)]
    pub offline: bool,
}
