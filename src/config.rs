// src/config.rs

use crate::error::ControlError;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

// --- Enums ---

/// How matrix rows are addressed in the written file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MatrixIndex {
  /// `lattvec(:,1) = ...`: one line per vector (ShengBTE's own layout).
  ColumnMajor,
  /// `lattvec(1,:) = ...`: one line per Cartesian component.
  RowMajor,
}

// --- Main Config Struct ---

/// Layout of the written CONTROL file. The defaults give the canonical form.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct FormatConfig {
  /// Spaces before each assignment.
  pub indent: usize,
  /// Array lines wrap once they would exceed this many characters.
  pub column_width: usize,
  pub matrix_index: MatrixIndex,
  pub blank_line_between_groups: bool,
}

impl Default for FormatConfig {
  fn default() -> Self {
    Self {
      indent: 4,
      column_width: 72,
      matrix_index: MatrixIndex::ColumnMajor,
      blank_line_between_groups: false,
    }
  }
}

impl FormatConfig {
  /// Loads a layout from a JSON file. Missing fields keep their defaults.
  pub fn load(path: impl AsRef<Path>) -> Result<Self, ControlError> {
    let file = File::open(path.as_ref())?;
    let cfg = serde_json::from_reader(BufReader::new(file))?;
    log::debug!("Format config loaded from {:?}", path.as_ref());
    Ok(cfg)
  }

  pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ControlError> {
    let file = File::create(path.as_ref())?;
    serde_json::to_writer_pretty(BufWriter::new(file), self)?;
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_partial_config_keeps_defaults() {
    let cfg: FormatConfig = serde_json::from_str(r#"{ "indent": 2 }"#).unwrap();
    assert_eq!(cfg.indent, 2);
    assert_eq!(cfg.column_width, 72);
    assert_eq!(cfg.matrix_index, MatrixIndex::ColumnMajor);
  }

  #[test]
  fn test_save_then_load() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("format.json");

    let cfg = FormatConfig {
      matrix_index: MatrixIndex::RowMajor,
      blank_line_between_groups: true,
      ..FormatConfig::default()
    };
    cfg.save(&path).unwrap();

    assert_eq!(FormatConfig::load(&path).unwrap(), cfg);
  }

  #[test]
  fn test_load_missing_file_is_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = FormatConfig::load(dir.path().join("absent.json")).unwrap_err();
    assert!(matches!(err, ControlError::Io(_)));
  }
}
