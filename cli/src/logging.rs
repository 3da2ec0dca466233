//! Logging setup for `bconv`.
//!
//! Logs go to stderr so generated code on stdout stays clean.
//!
//! - default: `warn`
//! - `-v`: `info`, `-vv`: `debug`, `-vvv` and up: `trace`
//! - `-q`: `error`
//!
//! `BCONV_LOG` takes an `EnvFilter` directive and overrides the flags.

use tracing::Level;
use tracing_subscriber::EnvFilter;

pub const LOG_ENV: &str = "BCONV_LOG";

/// Maps `-v`/`-q` to a level.
pub fn level(verbose: u8, quiet: bool) -> Level {
    if quiet {
        return Level::ERROR;
    }
    match verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    }
}

fn filter(level: Level) -> EnvFilter {
    EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(level.to_string().to_lowercase()))
}

/// Installs the global subscriber. A second call is a no-op.
pub fn init(verbose: u8, quiet: bool) {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter(level(verbose, quiet)))
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level() {
        assert_eq!(level(0, false), Level::WARN);
        assert_eq!(level(1, false), Level::INFO);
        assert_eq!(level(2, false), Level::DEBUG);
        assert_eq!(level(7, false), Level::TRACE);
        assert_eq!(level(3, true), Level::ERROR);
    }
}
