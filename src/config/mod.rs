//! Configuration layer: typed settings with layered precedence (file → env → CLI).

mod cli;

use std::{
    fmt,
    net::SocketAddr,
    num::NonZeroUsize,
    str::FromStr,
    time::Duration,
};

use clap::Parser;
use config::{Config, Environment, File};
use serde::Deserialize;
use thiserror::Error;
use time::{Date, macros::format_description};
use tracing::level_filters::LevelFilter;
use url::Url;

pub use cli::{CliArgs, Command, ResolveArgs, SanityOverrides, ServeArgs, ServeOverrides};

const DEFAULT_CONFIG_BASENAME: &str = "config/default";
const LOCAL_CONFIG_BASENAME: &str = "geographer";
const ENV_PREFIX: &str = "GEOGRAPHER";
const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_PORT: u16 = 3000;
const DEFAULT_GRACEFUL_SHUTDOWN_SECS: u64 = 30;
const DEFAULT_SANITY_DATASET: &str = "production";
const DEFAULT_SANITY_API_VERSION: &str = "2024-01-01";
const DEFAULT_SANITY_TIMEOUT_SECS: u64 = 10;
const DEFAULT_CACHE_QUERY_LIMIT: usize = 500;
const MAX_DATASET_LEN: usize = 64;

/// Fully-resolved deployment settings after precedence resolution and validation.
#[derive(Debug, Clone)]
pub struct Settings {
    pub server: ServerSettings,
    pub logging: LoggingSettings,
    pub sanity: SanitySettings,
    pub revalidate: RevalidateSettings,
    pub cache: CacheSettings,
}

#[derive(Debug, Clone)]
pub struct ServerSettings {
    pub addr: SocketAddr,
    pub graceful_shutdown: Duration,
}

#[derive(Debug, Clone)]
pub struct LoggingSettings {
    pub level: LevelFilter,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy)]
pub enum LogFormat {
    Json,
    Compact,
}

#[derive(Clone)]
pub struct SanitySettings {
    /// Absent until configured; only the content client needs it.
    pub project_id: Option<String>,
    pub dataset: String,
    pub api_version: String,
    pub use_cdn: bool,
    pub read_token: Option<String>,
    pub perspective: Option<String>,
    pub request_timeout: Duration,
    /// Replaces both the live and CDN hosts, e.g. for a local proxy.
    pub base_url: Option<Url>,
}

impl fmt::Debug for SanitySettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SanitySettings")
            .field("project_id", &self.project_id)
            .field("dataset", &self.dataset)
            .field("api_version", &self.api_version)
            .field("use_cdn", &self.use_cdn)
            .field("read_token", &self.read_token.as_ref().map(|_| "<redacted>"))
            .field("perspective", &self.perspective)
            .field("request_timeout", &self.request_timeout)
            .field("base_url", &self.base_url)
            .finish()
    }
}

#[derive(Clone, Default)]
pub struct RevalidateSettings {
    pub secret: Option<String>,
}

impl fmt::Debug for RevalidateSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RevalidateSettings")
            .field("secret", &self.secret.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct CacheSettings {
    pub enabled: bool,
    pub query_limit: NonZeroUsize,
    pub tag_namespace: Option<String>,
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to build configuration: {0}")]
    Build(#[from] config::ConfigError),
    #[error("invalid configuration for `{key}`: {reason}")]
    Invalid { key: &'static str, reason: String },
}

impl LoadError {
    fn invalid(key: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            key,
            reason: reason.into(),
        }
    }
}

/// Load settings using the configured precedence (file → environment → CLI).
pub fn load(cli: &CliArgs) -> Result<Settings, LoadError> {
    let mut builder = Config::builder()
        .add_source(File::with_name(DEFAULT_CONFIG_BASENAME).required(false))
        .add_source(File::with_name(LOCAL_CONFIG_BASENAME).required(false));

    if let Some(path) = cli.config_file.as_ref() {
        builder = builder.add_source(File::from(path.as_path()).required(true));
    }

    builder = builder.add_source(Environment::with_prefix(ENV_PREFIX).separator("__"));

    let mut raw: RawSettings = builder.build()?.try_deserialize()?;
    raw.apply_cli(cli);

    Settings::from_raw(raw)
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSettings {
    server: RawServerSettings,
    logging: RawLoggingSettings,
    sanity: RawSanitySettings,
    revalidate: RawRevalidateSettings,
    cache: RawCacheSettings,
}

impl RawSettings {
    fn apply_cli(&mut self, cli: &CliArgs) {
        self.apply_sanity_overrides(&cli.sanity);
        if let Some(secret) = cli.revalidate_secret.as_ref() {
            self.revalidate.secret = Some(secret.clone());
        }
        match cli.command.as_ref() {
            Some(Command::Serve(args)) => self.apply_serve_overrides(&args.overrides),
            Some(Command::Resolve(_)) | None => {}
        }
    }

    fn apply_sanity_overrides(&mut self, overrides: &SanityOverrides) {
        if let Some(project_id) = overrides.project_id.as_ref() {
            self.sanity.project_id = Some(project_id.clone());
        }
        if let Some(dataset) = overrides.dataset.as_ref() {
            self.sanity.dataset = Some(dataset.clone());
        }
        if let Some(version) = overrides.api_version.as_ref() {
            self.sanity.api_version = Some(version.clone());
        }
        if let Some(token) = overrides.read_token.as_ref() {
            self.sanity.read_token = Some(token.clone());
        }
        if let Some(use_cdn) = overrides.use_cdn {
            self.sanity.use_cdn = Some(use_cdn);
        }
    }

    fn apply_serve_overrides(&mut self, overrides: &ServeOverrides) {
        if let Some(host) = overrides.server_host.as_ref() {
            self.server.host = Some(host.clone());
        }
        if let Some(port) = overrides.server_port {
            self.server.port = Some(port);
        }
        if let Some(seconds) = overrides.server_graceful_shutdown_seconds {
            self.server.graceful_shutdown_seconds = Some(seconds);
        }
        if let Some(level) = overrides.log_level.as_ref() {
            self.logging.level = Some(level.clone());
        }
        if let Some(json) = overrides.log_json {
            self.logging.json = Some(json);
        }
        if let Some(enabled) = overrides.cache_enabled {
            self.cache.enabled = Some(enabled);
        }
        if let Some(limit) = overrides.cache_query_limit {
            self.cache.query_limit = Some(limit);
        }
    }
}

impl Settings {
    fn from_raw(raw: RawSettings) -> Result<Self, LoadError> {
        let RawSettings {
            server,
            logging,
            sanity,
            revalidate,
            cache,
        } = raw;

        Ok(Self {
            server: build_server_settings(server)?,
            logging: build_logging_settings(logging)?,
            sanity: build_sanity_settings(sanity)?,
            revalidate: build_revalidate_settings(revalidate),
            cache: build_cache_settings(cache)?,
        })
    }
}

fn build_server_settings(server: RawServerSettings) -> Result<ServerSettings, LoadError> {
    let host = server.host.unwrap_or_else(|| DEFAULT_HOST.to_string());

    let port = server.port.unwrap_or(DEFAULT_PORT);
    if port == 0 {
        return Err(LoadError::invalid(
            "server.port",
            "port must be greater than zero",
        ));
    }

    let addr = parse_socket_addr(&host, port)
        .map_err(|reason| LoadError::invalid("server.addr", reason))?;

    let graceful_secs = server
        .graceful_shutdown_seconds
        .unwrap_or(DEFAULT_GRACEFUL_SHUTDOWN_SECS);
    if graceful_secs == 0 {
        return Err(LoadError::invalid(
            "server.graceful_shutdown_seconds",
            "must be greater than zero",
        ));
    }

    Ok(ServerSettings {
        addr,
        graceful_shutdown: Duration::from_secs(graceful_secs),
    })
}

fn build_logging_settings(logging: RawLoggingSettings) -> Result<LoggingSettings, LoadError> {
    let level = match logging.level {
        Some(level) => LevelFilter::from_str(level.as_str()).map_err(|err| {
            LoadError::invalid("logging.level", format!("failed to parse: {err}"))
        })?,
        None => LevelFilter::INFO,
    };

    let format = if logging.json.unwrap_or(false) {
        LogFormat::Json
    } else {
        LogFormat::Compact
    };

    Ok(LoggingSettings { level, format })
}

fn build_sanity_settings(sanity: RawSanitySettings) -> Result<SanitySettings, LoadError> {
    let project_id = non_blank(sanity.project_id);
    if project_id
        .as_deref()
        .is_some_and(|id| !id.chars().all(|ch| ch.is_ascii_alphanumeric()))
    {
        return Err(LoadError::invalid(
            "sanity.project_id",
            "must contain only ASCII letters and digits",
        ));
    }

    let dataset = non_blank(sanity.dataset).unwrap_or_else(|| DEFAULT_SANITY_DATASET.to_string());
    if dataset.len() > MAX_DATASET_LEN
        || !dataset
            .chars()
            .all(|ch| ch.is_ascii_lowercase() || ch.is_ascii_digit() || ch == '_' || ch == '-')
    {
        return Err(LoadError::invalid(
            "sanity.dataset",
            "must be at most 64 characters of a-z, 0-9, `_` or `-`",
        ));
    }

    let api_version =
        non_blank(sanity.api_version).unwrap_or_else(|| DEFAULT_SANITY_API_VERSION.to_string());
    validate_api_version(&api_version)
        .map_err(|reason| LoadError::invalid("sanity.api_version", reason))?;

    let read_token = non_blank(sanity.read_token);
    let perspective = non_blank(sanity.perspective);
    if let Some(perspective) = perspective.as_deref() {
        match perspective {
            "published" | "raw" => {}
            "drafts" | "previewDrafts" if read_token.is_some() => {}
            "drafts" | "previewDrafts" => {
                return Err(LoadError::invalid(
                    "sanity.perspective",
                    "draft perspectives require a read token",
                ));
            }
            other => {
                return Err(LoadError::invalid(
                    "sanity.perspective",
                    format!("unknown perspective `{other}`"),
                ));
            }
        }
    }

    let timeout_secs = sanity
        .request_timeout_seconds
        .unwrap_or(DEFAULT_SANITY_TIMEOUT_SECS);
    if timeout_secs == 0 {
        return Err(LoadError::invalid(
            "sanity.request_timeout_seconds",
            "must be greater than zero",
        ));
    }

    let base_url = match non_blank(sanity.base_url) {
        Some(raw) => {
            let url = Url::parse(&raw)
                .map_err(|err| LoadError::invalid("sanity.base_url", err.to_string()))?;
            if !matches!(url.scheme(), "http" | "https") {
                return Err(LoadError::invalid(
                    "sanity.base_url",
                    "scheme must be http or https",
                ));
            }
            Some(url)
        }
        None => None,
    };

    Ok(SanitySettings {
        project_id,
        dataset,
        api_version,
        use_cdn: sanity.use_cdn.unwrap_or(true),
        read_token,
        perspective,
        request_timeout: Duration::from_secs(timeout_secs),
        base_url,
    })
}

fn build_revalidate_settings(revalidate: RawRevalidateSettings) -> RevalidateSettings {
    RevalidateSettings {
        secret: non_blank(revalidate.secret),
    }
}

fn build_cache_settings(cache: RawCacheSettings) -> Result<CacheSettings, LoadError> {
    let limit = cache.query_limit.unwrap_or(DEFAULT_CACHE_QUERY_LIMIT);
    let query_limit = NonZeroUsize::new(limit)
        .ok_or_else(|| LoadError::invalid("cache.query_limit", "must be greater than zero"))?;

    Ok(CacheSettings {
        enabled: cache.enabled.unwrap_or(true),
        query_limit,
        tag_namespace: non_blank(cache.tag_namespace),
    })
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawServerSettings {
    host: Option<String>,
    port: Option<u16>,
    graceful_shutdown_seconds: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawLoggingSettings {
    level: Option<String>,
    json: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSanitySettings {
    project_id: Option<String>,
    dataset: Option<String>,
    api_version: Option<String>,
    use_cdn: Option<bool>,
    read_token: Option<String>,
    perspective: Option<String>,
    request_timeout_seconds: Option<u64>,
    base_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawRevalidateSettings {
    secret: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawCacheSettings {
    enabled: Option<bool>,
    query_limit: Option<usize>,
    tag_namespace: Option<String>,
}

fn parse_socket_addr(host: &str, port: u16) -> Result<SocketAddr, String> {
    let candidate = format!("{host}:{port}");
    candidate
        .parse()
        .map_err(|err| format!("invalid address `{candidate}`: {err}"))
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.and_then(|value| {
        let trimmed = value.trim();
        (!trimmed.is_empty()).then(|| trimmed.to_string())
    })
}

/// Accepts `YYYY-MM-DD` with an optional `v` prefix, plus the legacy `1` and
/// the experimental `X`.
fn validate_api_version(version: &str) -> Result<(), String> {
    let bare = version.strip_prefix('v').unwrap_or(version);
    if bare == "1" || bare == "X" {
        return Ok(());
    }
    Date::parse(bare, format_description!("[year]-[month]-[day]"))
        .map(|_| ())
        .map_err(|err| format!("`{version}` is not a dated API version: {err}"))
}

/// Resolve configuration using the supplied CLI arguments, returning both for downstream use.
pub fn load_with_cli() -> Result<(CliArgs, Settings), LoadError> {
    let args = CliArgs::parse();
    let settings = load(&args)?;
    Ok((args, settings))
}
