use anyhow::{Context, Result};
use clap::{ArgAction, Parser, ValueEnum};
use std::{ffi::OsString, path::PathBuf, process, sync::Arc};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use wib::{render, Config, OutputFormat, WibClient, WibError};

const DEFAULTS_ENV: &str = "WIB_DEFAULTS";
const USER_ERROR_EXIT_CODE: i32 = 2;

/// Look up IP addresses and domains: geolocation, registration data and DNS.
#[derive(Parser, Debug)]
#[command(name = "wib", version, about)]
struct Cli {
    /// IP addresses or domains; defanged forms and URLs are accepted
    #[arg(required = true)]
    entities: Vec<String>,

    /// Also fetch DNS records for domains
    #[arg(long)]
    dns: bool,

    /// Per-request timeout in seconds
    #[arg(long)]
    timeout: Option<f64>,

    #[arg(long)]
    max_retries: Option<u32>,

    /// Concurrent requests allowed per remote host
    #[arg(long)]
    per_host_limit: Option<usize>,

    /// Entities resolved at once
    #[arg(long)]
    concurrency: Option<usize>,

    #[arg(short, long, value_enum, default_value_t = OutputArg::Table)]
    output: OutputArg,

    /// Write output to a file instead of stdout
    #[arg(long)]
    out_file: Option<PathBuf>,

    /// More logging (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,

    /// Less logging (-q errors only, -qq silent)
    #[arg(short, long, action = ArgAction::Count, conflicts_with = "verbose")]
    quiet: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputArg {
    Table,
    Json,
    Yaml,
    Md,
}

impl From<OutputArg> for OutputFormat {
    fn from(arg: OutputArg) -> Self {
        match arg {
            OutputArg::Table => OutputFormat::Table,
            OutputArg::Json => OutputFormat::Json,
            OutputArg::Yaml => OutputFormat::Yaml,
            OutputArg::Md => OutputFormat::Md,
        }
    }
}

impl Cli {
    /// Overlay command-line values on the loaded config and re-check it.
    fn apply(&self, config: &mut Config) -> Result<(), WibError> {
        if self.dns {
            config.include_dns = true;
        }
        if let Some(timeout) = self.timeout {
            config.timeout_seconds = timeout;
        }
        if let Some(max_retries) = self.max_retries {
            config.max_retries = max_retries;
        }
        if let Some(limit) = self.per_host_limit {
            config.per_host_limit = limit.max(1);
        }
        if let Some(concurrency) = self.concurrency {
            config.max_concurrent_lookups = concurrency.max(1);
        }
        config.validate()?;
        Ok(())
    }
}

/// Arguments from `WIB_DEFAULTS` go right after the program name.
fn with_defaults<I>(args: I, defaults: Option<&str>) -> Vec<OsString>
where
    I: IntoIterator<Item = OsString>,
{
    let mut args = args.into_iter();
    let mut merged: Vec<OsString> = args.next().into_iter().collect();
    if let Some(defaults) = defaults {
        merged.extend(defaults.split_whitespace().map(OsString::from));
    }
    merged.extend(args);
    merged
}

fn log_level(verbose: u8, quiet: u8) -> &'static str {
    match (quiet, verbose) {
        (q, _) if q >= 2 => "off",
        (1, _) => "error",
        (_, 0) => "warn",
        (_, 1) => "info",
        (_, 2) => "debug",
        _ => "trace",
    }
}

fn init_logging(verbose: u8, quiet: u8) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("wib={}", log_level(verbose, quiet))));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn exit_with(error: &WibError) -> ! {
    eprintln!("{}", error);
    process::exit(USER_ERROR_EXIT_CODE);
}

#[tokio::main]
async fn main() -> Result<()> {
    let defaults = std::env::var(DEFAULTS_ENV).ok();
    let cli = Cli::parse_from(with_defaults(std::env::args_os(), defaults.as_deref()));

    init_logging(cli.verbose, cli.quiet);

    let mut config = match Config::load() {
        Ok(config) => config,
        Err(e) => exit_with(&WibError::from(e)),
    };
    if let Err(e) = cli.apply(&mut config) {
        exit_with(&e);
    }
    debug!("Effective configuration: {:?}", config);

    let client = WibClient::new(Arc::new(config))?;

    let outcomes = match client.lookup_all(&cli.entities).await {
        Ok(outcomes) => outcomes,
        Err(e) if e.is_user_visible() => exit_with(&e),
        Err(e) => return Err(e.into()),
    };

    let mut results = Vec::with_capacity(outcomes.len());
    let mut failed = 0;
    for outcome in outcomes {
        match outcome.result {
            Ok(result) => results.push(result),
            Err(e) if e.is_user_visible() => {
                eprintln!("{}: {}", outcome.host.normalized, e);
                failed += 1;
            }
            Err(e) => {
                return Err(anyhow::Error::new(e)
                    .context(format!("Lookup of {} failed", outcome.host.normalized)))
            }
        }
    }

    if !results.is_empty() {
        let text = render(&results, cli.output.into())?;
        match &cli.out_file {
            Some(path) => {
                std::fs::write(path, &text)
                    .with_context(|| format!("Failed to write {}", path.display()))?;
                info!("Wrote {} result(s) to {}", results.len(), path.display());
            }
            None => println!("{}", text),
        }
    }

    if failed > 0 {
        process::exit(USER_ERROR_EXIT_CODE);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn os(args: &[&str]) -> Vec<OsString> {
        args.iter().map(OsString::from).collect()
    }

    #[test]
    fn test_defaults_are_prepended() {
        let merged = with_defaults(os(&["wib", "example.com"]), Some("--dns  -o json"));
        assert_eq!(merged, os(&["wib", "--dns", "-o", "json", "example.com"]));

        let merged = with_defaults(os(&["wib", "1.1.1.1"]), None);
        assert_eq!(merged, os(&["wib", "1.1.1.1"]));
    }

    #[test]
    fn test_cli_overrides_config() {
        let cli = Cli::parse_from(["wib", "--dns", "--timeout", "2.5", "--concurrency", "0", "-o", "yaml", "a.com", "b.com"]);
        let mut config = Config::default();
        cli.apply(&mut config).unwrap();

        assert!(config.include_dns);
        assert_eq!(config.timeout_seconds, 2.5);
        assert_eq!(config.max_concurrent_lookups, 1);
        assert_eq!(config.max_retries, 2);
        assert_eq!(OutputFormat::from(cli.output), OutputFormat::Yaml);
        assert_eq!(cli.entities, vec!["a.com", "b.com"]);
    }

    #[test]
    fn test_unusable_timeout_is_a_config_error() {
        for timeout in ["1e20", "inf", "0"] {
            let cli = Cli::parse_from(["wib", "--timeout", timeout, "a.com"]);
            let mut config = Config::default();
            let err = cli.apply(&mut config).unwrap_err();
            assert!(matches!(err, WibError::ConfigError(_)), "timeout {}: {:?}", timeout, err);
            assert!(err.is_user_visible());
        }
    }

    #[test]
    fn test_entities_are_required() {
        assert!(Cli::try_parse_from(["wib"]).is_err());
        assert!(Cli::try_parse_from(["wib", "-v", "-q", "x.com"]).is_err());
    }

    #[test]
    fn test_log_levels() {
        assert_eq!(log_level(0, 0), "warn");
        assert_eq!(log_level(1, 0), "info");
        assert_eq!(log_level(2, 0), "debug");
        assert_eq!(log_level(5, 0), "trace");
        assert_eq!(log_level(0, 1), "error");
        assert_eq!(log_level(0, 2), "off");
    }
}
