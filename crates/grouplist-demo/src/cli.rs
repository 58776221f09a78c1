#![forbid(unsafe_code)]

//! Command-line argument parsing for the grouped list demo.
//!
//! Parses `--flag=value` arguments by hand. Every option can also be set
//! through a `GROUPLIST_DEMO_*` environment variable; explicit flags win.

use std::env;
use std::fmt;
use std::path::PathBuf;
use std::process;

const VERSION: &str = env!("CARGO_PKG_VERSION");

const HELP_TEXT: &str = "\
FrankenTUI Grouped List Demo

Scrolls a virtualized, collapsible grouped list through a scripted session
and prints every frame, with item details fetched lazily on background threads.

USAGE:
    grouplist-demo [OPTIONS]

OPTIONS:
    --fixture=PATH        Load groups (and canned details) from a JSON fixture
    --groups=N            Synthetic group count when no fixture is given (default: 200)
    --items=N             Max items per synthetic group (default: 12)
    --seed=N              Seed for synthetic data (default: 7)
    --viewport=PX         Viewport height in pixels (default: 480)
    --header-height=PX    Header row height (default: 32)
    --item-height=PX      Item row height (default: 64)
    --overscan=PX         Overscan margin in pixels (default: 64)
    --delay-ms=N          Stabilization delay before fetching (default: 300)
    --latency-ms=N        Simulated fetch latency (default: 80)
    --fail-every=N        Fail every Nth fetch with a transport error, 0 = never (default: 0)
    --expand=N            Expand the first N groups at start (default: 3)
    --steps=N             Scripted scroll steps (default: 8)
    --step-px=PX          Pixels scrolled per step (default: 400)
    --step-ms=N           Pause between steps (default: 120)
    --state-dir=PATH      Persist expanded groups under PATH (default: in-memory)
    --log-json            Emit logs as JSON lines on stderr
    --help, -h            Show this help message
    --version, -V         Show version

ENVIRONMENT VARIABLES:
    RUST_LOG                      Log filter (default: info)
    GROUPLIST_DEMO_FIXTURE        Override --fixture
    GROUPLIST_DEMO_GROUPS         Override --groups
    GROUPLIST_DEMO_ITEMS          Override --items
    GROUPLIST_DEMO_SEED           Override --seed
    GROUPLIST_DEMO_VIEWPORT       Override --viewport
    GROUPLIST_DEMO_OVERSCAN       Override --overscan
    GROUPLIST_DEMO_DELAY_MS       Override --delay-ms
    GROUPLIST_DEMO_LATENCY_MS     Override --latency-ms
    GROUPLIST_DEMO_FAIL_EVERY     Override --fail-every
    GROUPLIST_DEMO_STEPS          Override --steps
    GROUPLIST_DEMO_STATE_DIR      Override --state-dir
    GROUPLIST_DEMO_LOG_JSON       Override --log-json (1/true to enable)";

/// Parsed command-line options.
#[derive(Debug, Clone, PartialEq)]
pub struct Opts {
    /// JSON fixture with groups and canned details.
    pub fixture: Option<PathBuf>,
    /// Synthetic group count.
    pub groups: usize,
    /// Maximum items per synthetic group.
    pub items: usize,
    /// Seed for synthetic data.
    pub seed: u64,
    pub viewport: u64,
    pub header_height: u32,
    pub item_height: u32,
    /// Overscan margin in pixels.
    pub overscan: u32,
    pub delay_ms: u64,
    /// Simulated fetch latency.
    pub latency_ms: u64,
    /// Fail every Nth fetch (0 = never).
    pub fail_every: u64,
    /// Groups expanded before the first frame.
    pub expand: usize,
    pub steps: usize,
    pub step_px: u64,
    pub step_ms: u64,
    /// Directory for the file-backed expansion store.
    pub state_dir: Option<PathBuf>,
    pub log_json: bool,
}

impl Default for Opts {
    fn default() -> Self {
        Self {
            fixture: None,
            groups: 200,
            items: 12,
            seed: 7,
            viewport: 480,
            header_height: 32,
            item_height: 64,
            overscan: 64,
            delay_ms: 300,
            latency_ms: 80,
            fail_every: 0,
            expand: 3,
            steps: 8,
            step_px: 400,
            step_ms: 120,
            state_dir: None,
            log_json: false,
        }
    }
}

/// Why argument parsing stopped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    Help,
    Version,
    InvalidValue { flag: &'static str, value: String },
    UnknownArg(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Help => write!(f, "help requested"),
            Self::Version => write!(f, "version requested"),
            Self::InvalidValue { flag, value } => write!(f, "invalid {flag} value: {value}"),
            Self::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
        }
    }
}

impl std::error::Error for ConfigError {}

fn flag_enabled(val: &str) -> bool {
    val == "1" || val.eq_ignore_ascii_case("true")
}

fn parse_value<T: std::str::FromStr>(flag: &'static str, val: &str) -> Result<T, ConfigError> {
    val.parse().map_err(|_| ConfigError::InvalidValue {
        flag,
        value: val.to_string(),
    })
}

impl Opts {
    /// Parse command-line arguments and environment variables, exiting on
    /// `--help`, `--version`, or invalid input.
    pub fn parse() -> Self {
        match Self::parse_from_env_and_args(env::args().skip(1), |key| env::var(key).ok()) {
            Ok(opts) => opts,
            Err(ConfigError::Help) => {
                println!("{HELP_TEXT}");
                process::exit(0);
            }
            Err(ConfigError::Version) => {
                println!("grouplist-demo {VERSION}");
                process::exit(0);
            }
            Err(err) => {
                eprintln!("{err}");
                eprintln!("Run with --help for usage information.");
                process::exit(1);
            }
        }
    }

    fn parse_from_env_and_args<I, S, F>(args: I, get_env: F) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
        F: Fn(&str) -> Option<String>,
    {
        let mut opts = Self::default();

        // Environment first; unparseable values are ignored.
        if let Some(val) = get_env("GROUPLIST_DEMO_FIXTURE")
            && !val.trim().is_empty()
        {
            opts.fixture = Some(PathBuf::from(val));
        }
        if let Some(val) = get_env("GROUPLIST_DEMO_GROUPS")
            && let Ok(n) = val.parse()
        {
            opts.groups = n;
        }
        if let Some(val) = get_env("GROUPLIST_DEMO_ITEMS")
            && let Ok(n) = val.parse()
        {
            opts.items = n;
        }
        if let Some(val) = get_env("GROUPLIST_DEMO_SEED")
            && let Ok(n) = val.parse()
        {
            opts.seed = n;
        }
        if let Some(val) = get_env("GROUPLIST_DEMO_VIEWPORT")
            && let Ok(n) = val.parse()
        {
            opts.viewport = n;
        }
        if let Some(val) = get_env("GROUPLIST_DEMO_OVERSCAN")
            && let Ok(n) = val.parse()
        {
            opts.overscan = n;
        }
        if let Some(val) = get_env("GROUPLIST_DEMO_DELAY_MS")
            && let Ok(n) = val.parse()
        {
            opts.delay_ms = n;
        }
        if let Some(val) = get_env("GROUPLIST_DEMO_LATENCY_MS")
            && let Ok(n) = val.parse()
        {
            opts.latency_ms = n;
        }
        if let Some(val) = get_env("GROUPLIST_DEMO_FAIL_EVERY")
            && let Ok(n) = val.parse()
        {
            opts.fail_every = n;
        }
        if let Some(val) = get_env("GROUPLIST_DEMO_STEPS")
            && let Ok(n) = val.parse()
        {
            opts.steps = n;
        }
        if let Some(val) = get_env("GROUPLIST_DEMO_STATE_DIR")
            && !val.trim().is_empty()
        {
            opts.state_dir = Some(PathBuf::from(val));
        }
        if let Some(val) = get_env("GROUPLIST_DEMO_LOG_JSON") {
            opts.log_json = flag_enabled(&val);
        }

        for arg in args {
            let arg = arg.as_ref();
            match arg {
                "--help" | "-h" => return Err(ConfigError::Help),
                "--version" | "-V" => return Err(ConfigError::Version),
                "--log-json" => opts.log_json = true,
                other => {
                    let Some((flag, val)) = other.split_once('=') else {
                        return Err(ConfigError::UnknownArg(other.to_string()));
                    };
                    match flag {
                        "--fixture" => opts.fixture = Some(PathBuf::from(val)),
                        "--groups" => opts.groups = parse_value("--groups", val)?,
                        "--items" => opts.items = parse_value("--items", val)?,
                        "--seed" => opts.seed = parse_value("--seed", val)?,
                        "--viewport" => opts.viewport = parse_value("--viewport", val)?,
                        "--header-height" => {
                            opts.header_height = parse_value("--header-height", val)?;
                        }
                        "--item-height" => opts.item_height = parse_value("--item-height", val)?,
                        "--overscan" => opts.overscan = parse_value("--overscan", val)?,
                        "--delay-ms" => opts.delay_ms = parse_value("--delay-ms", val)?,
                        "--latency-ms" => opts.latency_ms = parse_value("--latency-ms", val)?,
                        "--fail-every" => opts.fail_every = parse_value("--fail-every", val)?,
                        "--expand" => opts.expand = parse_value("--expand", val)?,
                        "--steps" => opts.steps = parse_value("--steps", val)?,
                        "--step-px" => opts.step_px = parse_value("--step-px", val)?,
                        "--step-ms" => opts.step_ms = parse_value("--step-ms", val)?,
                        "--state-dir" => opts.state_dir = Some(PathBuf::from(val)),
                        _ => return Err(ConfigError::UnknownArg(other.to_string())),
                    }
                }
            }
        }

        if opts.viewport == 0 {
            return Err(ConfigError::InvalidValue {
                flag: "--viewport",
                value: "0".into(),
            });
        }
        Ok(opts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_with_env(
        args: &[&str],
        env_pairs: &[(&'static str, &'static str)],
    ) -> Result<Opts, ConfigError> {
        let map: std::collections::HashMap<&str, &str> = env_pairs.iter().copied().collect();
        Opts::parse_from_env_and_args(args.iter().copied(), |key| {
            map.get(key).map(|value| (*value).to_string())
        })
    }

    #[test]
    fn defaults_without_args() {
        let opts = parse_with_env(&[], &[]).expect("defaults parse");
        assert_eq!(opts, Opts::default());
        assert_eq!(opts.delay_ms, 300);
        assert!(!opts.log_json);
    }

    #[test]
    fn flags_override_env() {
        let opts = parse_with_env(
            &["--groups=5", "--log-json", "--state-dir=/tmp/gl"],
            &[("GROUPLIST_DEMO_GROUPS", "50"), ("GROUPLIST_DEMO_DELAY_MS", "10")],
        )
        .expect("parse");
        assert_eq!(opts.groups, 5);
        assert_eq!(opts.delay_ms, 10);
        assert!(opts.log_json);
        assert_eq!(opts.state_dir, Some(PathBuf::from("/tmp/gl")));
    }

    #[test]
    fn invalid_env_is_ignored_but_invalid_flag_is_rejected() {
        let opts = parse_with_env(&[], &[("GROUPLIST_DEMO_VIEWPORT", "tall")]).expect("parse");
        assert_eq!(opts.viewport, 480);

        let err = parse_with_env(&["--viewport=tall"], &[]).expect_err("rejected");
        assert_eq!(
            err,
            ConfigError::InvalidValue {
                flag: "--viewport",
                value: "tall".into()
            }
        );
        assert_eq!(err.to_string(), "invalid --viewport value: tall");
    }

    #[test]
    fn zero_viewport_is_rejected() {
        assert!(matches!(
            parse_with_env(&["--viewport=0"], &[]),
            Err(ConfigError::InvalidValue { flag: "--viewport", .. })
        ));
    }

    #[test]
    fn unknown_and_meta_args() {
        assert_eq!(
            parse_with_env(&["--bogus"], &[]),
            Err(ConfigError::UnknownArg("--bogus".into()))
        );
        assert_eq!(
            parse_with_env(&["--bogus=1"], &[]),
            Err(ConfigError::UnknownArg("--bogus=1".into()))
        );
        assert_eq!(parse_with_env(&["-h"], &[]), Err(ConfigError::Help));
        assert_eq!(parse_with_env(&["--version"], &[]), Err(ConfigError::Version));
    }

    #[test]
    fn help_mentions_every_env_override() {
        for var in [
            "GROUPLIST_DEMO_GROUPS",
            "GROUPLIST_DEMO_DELAY_MS",
            "GROUPLIST_DEMO_STATE_DIR",
            "GROUPLIST_DEMO_LOG_JSON",
        ] {
            assert!(HELP_TEXT.contains(var), "{var} missing from help");
        }
        assert!(!VERSION.is_empty());
    }
}
