use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DebugTrace {
  Resolver,
  Deduction,
  Ordering,
  Loose,
  Ufcs,
  Ctfe,
  Completion,
  Symbols,
}

/// Knobs for the resolution core.
///
/// Expected format in sema.toml:
/// ```toml
/// [resolution]
/// strict_deduction = false
/// ctfe_max_depth = 32
/// enable_cache = true
/// resolve_base_classes = true
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ResolutionSettings {
  /// Specialization identifiers must match the argument exactly instead of by implicit conversion.
  pub strict_deduction: bool,
  /// Maximum nesting of compile-time function calls.
  pub ctfe_max_depth: u32,
  /// Memoize resolved syntax nodes per request.
  pub enable_cache: bool,
  pub resolve_base_classes: bool,
}

impl Default for ResolutionSettings {
  fn default() -> Self {
    Self {
      strict_deduction: false,
      ctfe_max_depth: 32,
      enable_cache: true,
      resolve_base_classes: true,
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CompletionSettings {
  pub show_ufcs_items: bool,
  pub show_static_properties: bool,
  pub show_override_items: bool,
}

impl Default for CompletionSettings {
  fn default() -> Self {
    Self {
      show_ufcs_items: true,
      show_static_properties: true,
      show_override_items: true,
    }
  }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SemaConfig {
  pub debug: bool,
  pub debug_trace: Vec<DebugTrace>,
  pub quiet: bool,
  pub verbose: u8,
  pub resolution: ResolutionSettings,
  pub completion: CompletionSettings,
}

impl SemaConfig {
  pub fn new(
    debug: bool,
    debug_trace: Vec<DebugTrace>,
    quiet: bool,
    verbose: u8,
  ) -> Self {
    Self {
      debug,
      debug_trace,
      quiet,
      verbose,
      ..Self::default()
    }
  }

  /// Config that never logs, for tests and embedding.
  pub fn silent() -> Self {
    Self {
      quiet: true,
      ..Self::default()
    }
  }

  pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
    toml::from_str(source).map_err(|e| ConfigError::Parse {
      path: None,
      message: e.to_string(),
    })
  }

  pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
    let path = path.as_ref();
    let source = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
      path: path.to_path_buf(),
      source,
    })?;

    toml::from_str(&source).map_err(|e| ConfigError::Parse {
      path: Some(path.to_path_buf()),
      message: e.to_string(),
    })
  }
}

/// Errors that can occur when loading a sema.toml.
#[derive(Debug)]
pub enum ConfigError {
  /// I/O error while reading the file.
  Io { path: PathBuf, source: std::io::Error },

  /// The file is not valid TOML or has unknown keys.
  Parse { path: Option<PathBuf>, message: String },
}

impl fmt::Display for ConfigError {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>,
  ) -> fmt::Result {
    match self {
      ConfigError::Io { path, source } => {
        write!(f, "failed to read '{}': {}", path.display(), source)
      },

      ConfigError::Parse { path: Some(path), message } => {
        write!(f, "failed to parse '{}': {}", path.display(), message)
      },

      ConfigError::Parse { path: None, message } => {
        write!(f, "failed to parse config: {}", message)
      },
    }
  }
}

impl std::error::Error for ConfigError {
  fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
    match self {
      ConfigError::Io { source, .. } => Some(source),
      ConfigError::Parse { .. } => None,
    }
  }
}
