//! CLI entry point for endpoint-contracts.
//!
//! Loads a TOML suite, runs every selected contract against the live
//! service and prints one line per contract plus a summary.
//!
//! Exit codes:
//! - 0: every contract passed
//! - 1: a contract failed or errored, or the suite could not be loaded
//! - 2: argument validation error (clap handles this automatically)

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;

use endpoint_contracts::client::{DEFAULT_REQUEST_TIMEOUT, ReqwestTransport, TransportConfig};
use endpoint_contracts::config::Suite;
use endpoint_contracts::logging::{self, LogConfig, LogFormat};
use endpoint_contracts::report::Summary;
use endpoint_contracts::runner::{ContractRunner, DEFAULT_CONCURRENCY};

#[derive(Parser)]
#[command(version, about, long_about = None)]
struct Cli {
    /// Suite file holding [defaults] and [[contracts]]. Secrets and URLs
    /// belong in environment variables referenced as ${VAR}.
    #[arg(long, env = "ENDPOINT_CONTRACTS_SUITE")]
    suite: PathBuf,

    /// Run only the named contract (repeatable).
    #[arg(long = "only", value_name = "NAME")]
    only: Vec<String>,

    /// Maximum number of contracts in flight (at least 1).
    #[arg(long, default_value_t = DEFAULT_CONCURRENCY, value_parser = at_least_one)]
    concurrency: usize,

    /// Per-request timeout in seconds (at least 1). Aborts the call;
    /// unrelated to a contract's max_response_time_ms assertion.
    #[arg(
        long,
        default_value_t = DEFAULT_REQUEST_TIMEOUT.as_secs(),
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    timeout_secs: u64,

    /// Print verdicts as a JSON array instead of the text summary.
    #[arg(long)]
    json: bool,

    /// Log filter used when RUST_LOG is unset.
    #[arg(long, default_value = "warn")]
    log_level: String,

    /// Log line format (logs go to stderr).
    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,
}

fn at_least_one(raw: &str) -> Result<usize, String> {
    match raw.parse::<usize>() {
        Ok(0) => Err("must be at least 1".to_string()),
        Ok(n) => Ok(n),
        Err(e) => Err(e.to_string()),
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Cli::parse();

    logging::init(
        &LogConfig::default()
            .with_level(&args.log_level)
            .with_format(args.log_format),
    );

    // Configuration problems abort before anything is dispatched.
    let suite = match Suite::load(&args.suite) {
        Ok(suite) => suite,
        Err(e) => {
            eprintln!("Error: {e}");
            return ExitCode::FAILURE;
        }
    };
    let contracts = match suite.select(&args.only) {
        Ok(contracts) => contracts,
        Err(e) => {
            eprintln!("Error: {e}");
            return ExitCode::FAILURE;
        }
    };

    let transport_config =
        TransportConfig::default().with_request_timeout(Duration::from_secs(args.timeout_secs));
    let transport = match ReqwestTransport::new(&transport_config) {
        Ok(transport) => transport,
        Err(e) => {
            eprintln!("Error: {e}");
            return ExitCode::FAILURE;
        }
    };

    let runner = ContractRunner::new(transport);
    let verdicts = runner.run_suite(&contracts, args.concurrency).await;
    let summary = Summary::from_verdicts(&verdicts);

    if args.json {
        match serde_json::to_string_pretty(&verdicts) {
            Ok(json) => println!("{json}"),
            Err(e) => {
                eprintln!("Error: could not encode verdicts: {e}");
                return ExitCode::FAILURE;
            }
        }
    } else {
        println!("{summary}");
    }

    if summary.success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_args() -> Vec<&'static str> {
        vec!["endpoint-contracts", "--suite", "contracts/board-portal.toml"]
    }

    #[test]
    fn minimal_invocation_uses_defaults() {
        let cli = Cli::try_parse_from(base_args()).expect("should parse with only --suite");
        assert_eq!(cli.suite, PathBuf::from("contracts/board-portal.toml"));
        assert!(cli.only.is_empty());
        assert_eq!(cli.concurrency, DEFAULT_CONCURRENCY);
        assert_eq!(cli.timeout_secs, 30);
        assert!(!cli.json);
        assert_eq!(cli.log_format, LogFormat::Text);
    }

    #[test]
    fn only_is_repeatable() {
        let mut args = base_args();
        args.extend_from_slice(&["--only", "users list", "--only", "roles without token"]);
        let cli = Cli::try_parse_from(args).expect("should accept repeated --only");
        assert_eq!(cli.only, vec!["users list", "roles without token"]);
    }

    #[test]
    fn output_and_logging_flags_parse() {
        let mut args = base_args();
        args.extend_from_slice(&[
            "--json",
            "--log-format",
            "json",
            "--log-level",
            "debug",
            "--concurrency",
            "8",
            "--timeout-secs",
            "5",
        ]);
        let cli = Cli::try_parse_from(args).expect("should parse all flags");
        assert!(cli.json);
        assert_eq!(cli.log_format, LogFormat::Json);
        assert_eq!(cli.log_level, "debug");
        assert_eq!(cli.concurrency, 8);
        assert_eq!(cli.timeout_secs, 5);
    }

    #[test]
    fn non_numeric_concurrency_is_rejected() {
        let mut args = base_args();
        args.extend_from_slice(&["--concurrency", "many"]);
        assert!(Cli::try_parse_from(args).is_err());
    }

    #[test]
    fn zero_concurrency_is_a_usage_error() {
        let mut args = base_args();
        args.extend_from_slice(&["--concurrency", "0"]);
        let err = Cli::try_parse_from(args).err().expect("zero should be rejected");
        assert_eq!(err.kind(), clap::error::ErrorKind::ValueValidation);
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn zero_timeout_is_a_usage_error() {
        let mut args = base_args();
        args.extend_from_slice(&["--timeout-secs", "0"]);
        let err = Cli::try_parse_from(args).err().expect("zero should be rejected");
        assert_eq!(err.kind(), clap::error::ErrorKind::ValueValidation);
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn unknown_log_format_is_rejected() {
        let mut args = base_args();
        args.extend_from_slice(&["--log-format", "xml"]);
        assert!(Cli::try_parse_from(args).is_err());
    }
}
