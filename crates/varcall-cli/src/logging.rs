//! Tracing subscriber setup.
//!
//! `VARCALL_LOG` takes `EnvFilter` directives; without it the filter is
//! `warn`, or `debug` for the varcall crates when `--verbose` is given.

use std::io::IsTerminal;

use tracing_subscriber::{fmt, EnvFilter};
use varcall_engine::defaults::{DEFAULT_LOG_FILTER, LOG_ENV_VAR};

const VERBOSE_FILTER: &str = "warn,varcall_engine=debug,varcall_com=debug";

pub fn filter_directive(verbose: bool) -> &'static str {
    if verbose {
        VERBOSE_FILTER
    } else {
        DEFAULT_LOG_FILTER
    }
}

pub fn init(verbose: bool) {
    let filter = EnvFilter::try_from_env(LOG_ENV_VAR)
        .unwrap_or_else(|_| EnvFilter::new(filter_directive(verbose)));
    let use_ansi = std::env::var_os("NO_COLOR").is_none() && std::io::stderr().is_terminal();

    let subscriber = fmt::fmt()
        .with_env_filter(filter)
        .with_ansi(use_ansi)
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_thread_names(true)
        .compact()
        .finish();
    let _ = tracing::subscriber::set_global_default(subscriber);
}
