#![forbid(unsafe_code)]

//! Command-line argument parsing for the player.
//!
//! Parses args manually to keep the binary lean. Environment variables
//! (`STEPWISE_*`) provide defaults that explicit flags override.

use std::env;
use std::path::PathBuf;
use std::process;

use stepwise_client::config::{API_URL_ENV, DEFAULT_API_URL};

use crate::app::PlayerConfig;

const VERSION: &str = env!("CARGO_PKG_VERSION");

const HELP_TEXT: &str = "\
Stepwise - step through algorithm traces and predict each decision

USAGE:
    stepwise [OPTIONS]

OPTIONS:
    --api-url=URL        Backend base URL (default: http://localhost:5000/api)
    --algorithm=NAME     Registered algorithm to load first
    --watch              Start with prediction mode off
    --log-file=PATH      Write logs to PATH (default: stepwise.log)
    --help, -h           Show this help message
    --version, -V        Show version

KEYBINDINGS:
    Right / Space        Next step
    Left                 Previous step
    r / Home             Reset to the first step
    End                  Jump to the last step
    Esc                  Step back from the completion summary
    g                    Go to a step by number
    p                    Toggle prediction mode
    i                    Algorithm info
    Tab / Shift-Tab      Cycle algorithms
    l                    Reload the trace
    q / Ctrl+C           Quit

PREDICTION PROMPT:
    1-9 or first letter  Select a choice
    Enter                Submit, then continue
    s / Esc              Skip

ENVIRONMENT VARIABLES (flags take precedence):
    STEPWISE_API_URL     Default for --api-url
    STEPWISE_ALGORITHM   Default for --algorithm
    STEPWISE_PREDICT     Set to 0 to start in watch mode
    RUST_LOG             Log filter (default: info)";

/// Parsed command-line options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Opts {
    /// Backend base URL.
    pub api_url: String,
    /// Algorithm to load first.
    pub algorithm: Option<String>,
    /// Initial prediction mode.
    pub predict: bool,
    /// Log destination.
    pub log_file: PathBuf,
}

impl Default for Opts {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.into(),
            algorithm: None,
            predict: true,
            log_file: PathBuf::from("stepwise.log"),
        }
    }
}

/// What the command line asked for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Parsed {
    Run(Opts),
    Help,
    Version,
}

impl Opts {
    /// Parse process arguments and environment; exits on `--help`,
    /// `--version` and bad input.
    pub fn parse() -> Self {
        let args = env::args().skip(1);
        match Self::parse_from(args, |key| env::var(key).ok()) {
            Ok(Parsed::Run(opts)) => opts,
            Ok(Parsed::Help) => {
                println!("{HELP_TEXT}");
                process::exit(0);
            }
            Ok(Parsed::Version) => {
                println!("stepwise {VERSION}");
                process::exit(0);
            }
            Err(msg) => {
                eprintln!("{msg}");
                eprintln!("Run with --help for usage information.");
                process::exit(1);
            }
        }
    }

    /// Parse `args` with `var` as the environment lookup.
    pub fn parse_from<I, F>(args: I, var: F) -> Result<Parsed, String>
    where
        I: IntoIterator<Item = String>,
        F: Fn(&str) -> Option<String>,
    {
        let mut opts = Self::default();

        // Apply environment variable defaults first
        if let Some(val) = var(API_URL_ENV).filter(|v| !v.trim().is_empty()) {
            opts.api_url = val.trim().to_owned();
        }
        if let Some(val) = var("STEPWISE_ALGORITHM").filter(|v| !v.trim().is_empty()) {
            opts.algorithm = Some(val.trim().to_owned());
        }
        if let Some(val) = var("STEPWISE_PREDICT") {
            opts.predict = !matches!(val.trim(), "0" | "false" | "off" | "no");
        }

        // Parse command-line args (override env vars)
        for arg in args {
            match arg.as_str() {
                "--help" | "-h" => return Ok(Parsed::Help),
                "--version" | "-V" => return Ok(Parsed::Version),
                "--watch" => opts.predict = false,
                other => {
                    if let Some(val) = other.strip_prefix("--api-url=") {
                        if val.is_empty() {
                            return Err("Invalid --api-url value: empty".into());
                        }
                        opts.api_url = val.to_string();
                    } else if let Some(val) = other.strip_prefix("--algorithm=") {
                        opts.algorithm = (!val.is_empty()).then(|| val.to_string());
                    } else if let Some(val) = other.strip_prefix("--log-file=") {
                        if val.is_empty() {
                            return Err("Invalid --log-file value: empty".into());
                        }
                        opts.log_file = PathBuf::from(val);
                    } else {
                        return Err(format!("Unknown argument: {other}"));
                    }
                }
            }
        }

        Ok(Parsed::Run(opts))
    }

    /// Player settings derived from these options.
    #[must_use]
    pub fn player_config(&self) -> PlayerConfig {
        PlayerConfig {
            algorithm: self.algorithm.clone(),
            predict: self.predict,
            api_url: self.api_url.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str], env: &[(&str, &str)]) -> Result<Parsed, String> {
        let env: Vec<(String, String)> = env
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect();
        Opts::parse_from(args.iter().map(|a| (*a).to_owned()), |key| {
            env.iter().find(|(k, _)| k == key).map(|(_, v)| v.clone())
        })
    }

    fn run(args: &[&str], env: &[(&str, &str)]) -> Opts {
        match parse(args, env) {
            Ok(Parsed::Run(opts)) => opts,
            other => panic!("expected options, got {other:?}"),
        }
    }

    #[test]
    fn default_opts() {
        let opts = run(&[], &[]);
        assert_eq!(opts, Opts::default());
        assert_eq!(opts.api_url, "http://localhost:5000/api");
        assert!(opts.predict);
    }

    #[test]
    fn env_sets_defaults_and_flags_override() {
        let env = [
            ("STEPWISE_API_URL", "http://backend:9000/api"),
            ("STEPWISE_ALGORITHM", "binary-search"),
            ("STEPWISE_PREDICT", "0"),
        ];
        let opts = run(&[], &env);
        assert_eq!(opts.api_url, "http://backend:9000/api");
        assert_eq!(opts.algorithm.as_deref(), Some("binary-search"));
        assert!(!opts.predict);

        let opts = run(&["--api-url=http://other/api", "--algorithm=two-pointer"], &env);
        assert_eq!(opts.api_url, "http://other/api");
        assert_eq!(opts.algorithm.as_deref(), Some("two-pointer"));
    }

    #[test]
    fn watch_flag_disables_prediction() {
        assert!(!run(&["--watch"], &[]).predict);
        assert!(run(&[], &[("STEPWISE_PREDICT", "1")]).predict);
    }

    #[test]
    fn help_version_and_errors() {
        assert_eq!(parse(&["-h"], &[]), Ok(Parsed::Help));
        assert_eq!(parse(&["--version"], &[]), Ok(Parsed::Version));
        assert_eq!(
            parse(&["--bogus"], &[]),
            Err("Unknown argument: --bogus".to_owned())
        );
        assert!(parse(&["--api-url="], &[]).is_err());
    }

    #[test]
    fn log_file_flag() {
        let opts = run(&["--log-file=/tmp/sw.log"], &[]);
        assert_eq!(opts.log_file, PathBuf::from("/tmp/sw.log"));
    }

    #[test]
    fn help_text_lists_env_vars() {
        assert!(HELP_TEXT.contains("STEPWISE_API_URL"));
        assert!(HELP_TEXT.contains("STEPWISE_PREDICT"));
        assert!(HELP_TEXT.contains("Default for --api-url"));
        assert!(!HELP_TEXT.contains("Override"));
        assert!(!VERSION.is_empty());
    }
}
