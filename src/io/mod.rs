// src/io/mod.rs
pub mod control;
pub mod namelist;

use crate::config::FormatConfig;
use crate::error::ControlError;
use crate::model::Control;
use std::path::Path;

/// Loads a control from disk. `*.json` files hold the `as_dict` form;
/// everything else is read as a CONTROL namelist.
pub fn load_control(path: impl AsRef<Path>) -> Result<Control, ControlError> {
    let path = path.as_ref();
    if is_json(path) {
        control::parse_json(path)
    } else {
        control::parse(path)
    }
}

pub fn save_control(
    path: impl AsRef<Path>,
    control: &Control,
    config: &FormatConfig,
) -> Result<(), ControlError> {
    let path = path.as_ref();
    if is_json(path) {
        control::write_json(path, control)
    } else {
        control::write(path, control, config)
    }
}

fn is_json(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("json"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dispatch_by_extension() {
        let dir = tempfile::tempdir().unwrap();
        let control: Control = "&allocations\n natoms = 4\n/".parse().unwrap();

        for name in ["CONTROL", "control.JSON"] {
            let path = dir.path().join(name);
            save_control(&path, &control, &FormatConfig::default()).unwrap();
            assert_eq!(load_control(&path).unwrap(), control);
        }

        let text = std::fs::read_to_string(dir.path().join("control.JSON")).unwrap();
        assert!(text.contains("\"@class\": \"Control\""));
    }
}
