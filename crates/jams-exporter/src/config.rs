//! Exporter configuration: CLI flags, environment, and an optional TOML file.
//!
//! Precedence is CLI/env over file over built-in defaults.

use std::fmt;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, bail};
use clap::{Parser, ValueEnum};
use jams_collector::JobCountMode;
use serde::Deserialize;

const DEFAULT_PORT: u16 = 8000;
const DEFAULT_LOG_LEVEL: &str = "error";
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Serve JAMS scheduler state as Prometheus metrics.
#[derive(Parser, Debug, Default)]
#[command(name = "jams-exporter", version, about, long_about = None)]
pub struct Cli {
    /// Path to a TOML configuration file.
    #[arg(short, long, env = "JAMS_EXPORTER_CONFIG")]
    pub config: Option<PathBuf>,

    /// JAMS host with scheme and port, e.g. http://localhost:6371.
    #[arg(long, env = "JAMS_HOST")]
    pub host: Option<String>,

    /// JAMS user name.
    #[arg(short, long, env = "JAMS_USERNAME")]
    pub username: Option<String>,

    /// JAMS user password.
    #[arg(short, long, env = "JAMS_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// Ignore TLS certificate errors.
    #[arg(long)]
    pub skip_verify: bool,

    /// Port to listen on.
    #[arg(long, env = "JAMS_EXPORTER_PORT")]
    pub port: Option<u16>,

    /// Address to bind.
    #[arg(long)]
    pub bind: Option<IpAddr>,

    /// Log level (RUST_LOG overrides).
    #[arg(short, long, value_parser = ["error", "warn", "info", "debug", "trace"])]
    pub log_level: Option<String>,

    #[arg(long, value_enum)]
    pub log_format: Option<LogFormat>,

    /// Maximum JAMS calls in flight at once (unbounded if unset).
    #[arg(long)]
    pub max_concurrency: Option<usize>,

    /// Timeout for each JAMS HTTP call, in seconds.
    #[arg(long)]
    pub request_timeout_secs: Option<u64>,

    /// Cancel outstanding JAMS calls of a scrape after this many seconds.
    #[arg(long)]
    pub scrape_timeout_secs: Option<u64>,

    /// How folder job counts combine into jams_jobs_count_total: sum or last-batch.
    #[arg(long)]
    pub job_count_mode: Option<JobCountMode>,
}

/// Contents of the TOML configuration file. Every key is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub host: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub skip_verify: Option<bool>,
    pub port: Option<u16>,
    pub bind: Option<IpAddr>,
    pub log_level: Option<String>,
    pub log_format: Option<LogFormat>,
    pub max_concurrency: Option<usize>,
    pub request_timeout_secs: Option<u64>,
    pub scrape_timeout_secs: Option<u64>,
    pub job_count_mode: Option<JobCountMode>,
}

impl FileConfig {
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("read config file {}", path.display()))?;
        let config: FileConfig = toml::from_str(&content)
            .with_context(|| format!("parse config file {}", path.display()))?;
        Ok(config)
    }
}

/// Fully resolved settings.
#[derive(Clone)]
pub struct ExporterConfig {
    pub host: String,
    pub username: String,
    pub password: String,
    pub skip_verify: bool,
    pub listen: SocketAddr,
    pub log_level: String,
    pub log_format: LogFormat,
    pub max_concurrency: Option<usize>,
    pub request_timeout: Duration,
    pub scrape_timeout: Option<Duration>,
    pub job_count_mode: JobCountMode,
}

impl fmt::Debug for ExporterConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExporterConfig")
            .field("host", &self.host)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("skip_verify", &self.skip_verify)
            .field("listen", &self.listen)
            .field("log_level", &self.log_level)
            .field("log_format", &self.log_format)
            .field("max_concurrency", &self.max_concurrency)
            .field("request_timeout", &self.request_timeout)
            .field("scrape_timeout", &self.scrape_timeout)
            .field("job_count_mode", &self.job_count_mode)
            .finish()
    }
}

impl ExporterConfig {
    /// Load the file named by `--config` (if any) and merge it with the CLI.
    pub fn resolve(cli: Cli) -> anyhow::Result<Self> {
        let file = match &cli.config {
            Some(path) => FileConfig::from_file(path)?,
            None => FileConfig::default(),
        };
        Self::merge(cli, file)
    }

    pub fn merge(cli: Cli, file: FileConfig) -> anyhow::Result<Self> {
        let Some(host) = cli.host.or(file.host) else {
            bail!("missing JAMS host (--host or JAMS_HOST)");
        };
        let Some(username) = cli.username.or(file.username).filter(|u| !u.is_empty()) else {
            bail!("missing JAMS username (--username or JAMS_USERNAME)");
        };
        let Some(password) = cli.password.or(file.password).filter(|p| !p.is_empty()) else {
            bail!("missing JAMS password (--password or JAMS_PASSWORD)");
        };
        if !host.starts_with("http://") && !host.starts_with("https://") {
            bail!("JAMS host must include a scheme, e.g. https://{host}");
        }

        let bind = cli
            .bind
            .or(file.bind)
            .unwrap_or(IpAddr::V4(Ipv4Addr::UNSPECIFIED));
        let port = cli.port.or(file.port).unwrap_or(DEFAULT_PORT);

        Ok(Self {
            host,
            username,
            password,
            skip_verify: cli.skip_verify || file.skip_verify.unwrap_or(false),
            listen: SocketAddr::new(bind, port),
            log_level: cli
                .log_level
                .or(file.log_level)
                .unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_string()),
            log_format: cli.log_format.or(file.log_format).unwrap_or_default(),
            max_concurrency: cli.max_concurrency.or(file.max_concurrency),
            request_timeout: Duration::from_secs(
                cli.request_timeout_secs
                    .or(file.request_timeout_secs)
                    .unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS),
            ),
            scrape_timeout: cli
                .scrape_timeout_secs
                .or(file.scrape_timeout_secs)
                .map(Duration::from_secs),
            job_count_mode: cli.job_count_mode.or(file.job_count_mode).unwrap_or_default(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn cli(args: &[&str]) -> Cli {
        let mut argv = vec!["jams-exporter"];
        argv.extend_from_slice(args);
        Cli::try_parse_from(argv).unwrap()
    }

    #[test]
    fn cli_only_uses_defaults() {
        let config = ExporterConfig::merge(
            cli(&["--host", "https://jams:6371", "-u", "svc", "-p", "pw"]),
            FileConfig::default(),
        )
        .unwrap();

        assert_eq!(config.host, "https://jams:6371");
        assert_eq!(config.listen, "0.0.0.0:8000".parse().unwrap());
        assert_eq!(config.log_level, "error");
        assert_eq!(config.log_format, LogFormat::Text);
        assert!(!config.skip_verify);
        assert_eq!(config.request_timeout, Duration::from_secs(30));
        assert!(config.scrape_timeout.is_none());
        assert!(config.max_concurrency.is_none());
        assert_eq!(config.job_count_mode, JobCountMode::Sum);
    }

    #[test]
    fn cli_overrides_file() {
        let file: FileConfig = toml::from_str(
            r#"
            host = "https://from-file:6371"
            username = "file-user"
            password = "file-pw"
            port = 9100
            skip_verify = true
            log_level = "info"
            job_count_mode = "last-batch"
            max_concurrency = 16
            "#,
        )
        .unwrap();

        let config = ExporterConfig::merge(
            cli(&["--port", "9200", "--job-count-mode", "sum", "-l", "debug"]),
            file,
        )
        .unwrap();

        assert_eq!(config.host, "https://from-file:6371");
        assert_eq!(config.username, "file-user");
        assert_eq!(config.listen.port(), 9200);
        assert!(config.skip_verify);
        assert_eq!(config.log_level, "debug");
        assert_eq!(config.job_count_mode, JobCountMode::Sum);
        assert_eq!(config.max_concurrency, Some(16));
    }

    #[test]
    fn missing_password_is_rejected() {
        let err = ExporterConfig::merge(
            cli(&["--host", "http://jams:6371", "-u", "svc"]),
            FileConfig::default(),
        )
        .unwrap_err();
        assert!(err.to_string().contains("password"));
    }

    #[test]
    fn host_without_scheme_is_rejected() {
        let err = ExporterConfig::merge(
            cli(&["--host", "jams:6371", "-u", "svc", "-p", "pw"]),
            FileConfig::default(),
        )
        .unwrap_err();
        assert!(err.to_string().contains("scheme"));
    }

    #[test]
    fn unknown_file_keys_are_rejected() {
        assert!(toml::from_str::<FileConfig>("hots = \"typo\"").is_err());
    }

    #[test]
    fn invalid_log_level_is_rejected_by_cli() {
        assert!(Cli::try_parse_from(["jams-exporter", "-l", "verbose"]).is_err());
    }

    #[test]
    fn resolve_reads_config_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "host = \"http://localhost:6371\"\nusername = \"svc\"\npassword = \"pw\"\nscrape_timeout_secs = 20\nlog_format = \"json\""
        )
        .unwrap();

        let cli = Cli {
            config: Some(file.path().to_path_buf()),
            ..Default::default()
        };
        let config = ExporterConfig::resolve(cli).unwrap();

        assert_eq!(config.scrape_timeout, Some(Duration::from_secs(20)));
        assert_eq!(config.log_format, LogFormat::Json);
        assert!(!format!("{config:?}").contains("\"pw\""));
    }

    #[test]
    fn missing_config_file_is_an_error() {
        let cli = Cli {
            config: Some(PathBuf::from("/nonexistent/jams-exporter.toml")),
            ..Default::default()
        };
        assert!(ExporterConfig::resolve(cli).is_err());
    }
}
