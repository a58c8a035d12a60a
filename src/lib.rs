//! NPE cause analysis for a managed bytecode runtime's `ExceptionRaised` event (§1).
//!
//! The crate is split into a bytecode model (`constants`, `descriptors`,
//! `access_flags`, `code_attribute`, `local_variables`, `instructions`, `method`,
//! `field`, `attributes`, `class_file`), the two-phase cause analyzer
//! (`stack_oracle`, `analyzer`), and the host boundary (`host`,
//! `exception_callback`) that ties the analyzer to a live agent environment or the
//! in-memory `MockHostAdapter` used by the CLI harness and tests.

#![allow(unused)]

pub mod access_flags;
pub mod analyzer;
pub mod attributes;
pub mod class_file;
pub mod code_attribute;
pub mod constants;
pub mod descriptors;
pub mod errors;
pub mod exception_callback;
pub mod field;
pub mod host;
pub mod instructions;
pub mod local_variables;
pub mod method;
pub mod stack_oracle;

/// Parses the agent's single on-load option string (§6) into a log-level filter.
///
/// Recognizes `"debug"` and `"trace"`; anything else (including an absent or empty
/// options string) leaves the default `info` filter in place. The production agent's
/// `Agent_OnLoad`-equivalent calls this once, before requesting capabilities and
/// registering the `ExceptionRaised` callback — both mechanical host-binding concerns
/// out of this crate's scope (§1), so only the option parsing lives here.
pub fn configured_log_level(options: &str) -> log::LevelFilter {
    let level = match options.trim() {
        "debug" => log::LevelFilter::Debug,
        "trace" => log::LevelFilter::Trace,
        _ => log::LevelFilter::Info,
    };
    log::info!(target: "Boot", "agent options {options:?} resolved to log level {level}");
    level
}

/// Brings up `env_logger` for tests that want to see `Bytecode`/`Analyzer`/
/// `ExceptionCallback` trace output (`RUST_LOG=npe_trace=trace cargo test --
/// --nocapture`). Idempotent: later calls from other tests in the same run are
/// no-ops.
#[cfg(test)]
pub(crate) fn init_test_logging() {
    let _ = env_logger::try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recognizes_debug_and_trace() {
        assert_eq!(configured_log_level("debug"), log::LevelFilter::Debug);
        assert_eq!(configured_log_level("trace"), log::LevelFilter::Trace);
    }

    #[test]
    fn unknown_or_absent_options_default_to_info() {
        assert_eq!(configured_log_level(""), log::LevelFilter::Info);
        assert_eq!(configured_log_level("verbose"), log::LevelFilter::Info);
    }
}
