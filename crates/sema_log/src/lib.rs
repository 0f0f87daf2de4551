//! Logging utilities for the resolution core.
//!
//! Provides macros for:
//! - Warnings (`phase_warn!`)
//! - Debug traces by category (`trace_dbg!`)
//! - Verbose logging (`log_dbg!`, `log_trc!`)
//!
//! All output goes to stderr so it never mixes with dumps on stdout.

use sema_config::{DebugTrace, SemaConfig};

pub fn effective_verbose(config: &SemaConfig) -> u8 {
  if config.quiet {
    return 0;
  }

  if config.debug && config.verbose < 2 {
    return 2;
  }

  config.verbose
}

pub fn log_phase(config: &SemaConfig) -> bool {
  !config.quiet
}

pub fn log_debug(config: &SemaConfig) -> bool {
  effective_verbose(config) >= 2
}

pub fn log_trace(config: &SemaConfig) -> bool {
  effective_verbose(config) >= 3
}

pub fn debug_trace_enabled(
  config: &SemaConfig,
  trace: DebugTrace,
) -> bool {
  !config.quiet && (config.debug || config.debug_trace.contains(&trace))
}

/// Returns lowercase name of a DebugTrace variant for log output.
pub fn trace_name(trace: DebugTrace) -> &'static str {
  match trace {
    DebugTrace::Resolver => "resolver",
    DebugTrace::Deduction => "deduction",
    DebugTrace::Ordering => "ordering",
    DebugTrace::Loose => "loose",
    DebugTrace::Ufcs => "ufcs",
    DebugTrace::Ctfe => "ctfe",
    DebugTrace::Completion => "completion",
    DebugTrace::Symbols => "symbols",
  }
}

/// Log a warning (yellow arrow, no indent).
///
/// # Examples
///
/// ```ignore
/// phase_warn!(&config, "ctfe failed for {}", name);
/// ```
#[macro_export]
macro_rules! phase_warn {
  ($config:expr, $fmt:literal $(, $arg:expr)* $(,)?) => {{
    if $crate::log_phase($config) {
      use colored::Colorize;
      eprintln!("{} {}", "-->".bright_yellow().bold(), format!($fmt $(, $arg)*));
    }
  }};
}

/// Log a debug trace for a specific resolver component.
///
/// Output format: `debug[component]: message`
///
/// # Examples
///
/// ```ignore
/// trace_dbg!(&config, DebugTrace::Ufcs, "accepted {}", name);
/// // Output: debug[ufcs]: accepted reverse
/// ```
#[macro_export]
macro_rules! trace_dbg {
  ($config:expr, $trace:expr, $fmt:literal $(, $arg:expr)* $(,)?) => {{
    if $crate::debug_trace_enabled($config, $trace) {
      eprintln!(
        "debug[{}]: {}",
        $crate::trace_name($trace),
        format!($fmt $(, $arg)*)
      );
    }
  }};
}

/// Log a verbose debug message (verbosity >= 2).
#[macro_export]
macro_rules! log_dbg {
  ($config:expr, $fmt:literal $(, $arg:expr)* $(,)?) => {{
    if $crate::log_debug($config) {
      eprintln!("debug: {}", format!($fmt $(, $arg)*));
    }
  }};
}

/// Log a trace message (verbosity >= 3).
#[macro_export]
macro_rules! log_trc {
  ($config:expr, $fmt:literal $(, $arg:expr)* $(,)?) => {{
    if $crate::log_trace($config) {
      eprintln!("trace: {}", format!($fmt $(, $arg)*));
    }
  }};
}
