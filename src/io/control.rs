// src/io/control.rs
//
// File-level entry points for the CONTROL namelist. The file handle lives
// only inside each call.

use crate::config::FormatConfig;
use crate::error::ControlError;
use crate::io::namelist;
use crate::model::Control;
use std::fs::{self, File};
use std::io::{self, BufWriter, Read, Write};
use std::path::Path;

pub fn parse(path: &Path) -> Result<Control, ControlError> {
    let content = fs::read_to_string(path)?;
    log::debug!("Reading CONTROL from {:?}", path);
    parse_str(&content)
}

pub fn parse_reader(mut reader: impl Read) -> Result<Control, ControlError> {
    let mut content = String::new();
    reader.read_to_string(&mut content)?;
    parse_str(&content)
}

pub fn parse_str(content: &str) -> Result<Control, ControlError> {
    let nml = namelist::parse(content)?;
    Ok(Control::from_namelist(&nml)?)
}

pub fn write(path: &Path, control: &Control, config: &FormatConfig) -> Result<(), ControlError> {
    let file = File::create(path)?;
    write_to(BufWriter::new(file), control, config)?;
    log::debug!("CONTROL written to {:?}", path);
    Ok(())
}

pub fn write_to(
    mut writer: impl Write,
    control: &Control,
    config: &FormatConfig,
) -> Result<(), ControlError> {
    writer.write_all(control.to_namelist_string(config).as_bytes())?;
    writer.flush()?;
    Ok(())
}

/// Writes `control` as pretty-printed `as_dict` JSON.
pub fn write_json(path: &Path, control: &Control) -> Result<(), ControlError> {
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, control)?;
    writer.flush()?;
    Ok(())
}

pub fn parse_json(path: &Path) -> Result<Control, ControlError> {
    let file = File::open(path)?;
    let control = serde_json::from_reader(io::BufReader::new(file))?;
    Ok(control)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Value;

    #[test]
    fn test_missing_file_propagates_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = parse(&dir.path().join("CONTROL")).unwrap_err();
        match err {
            ControlError::Io(e) => assert_eq!(e.kind(), io::ErrorKind::NotFound),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_reader_and_writer() {
        let text = "&parameters\n    t = 300.0\n/\n";
        let control = parse_reader(text.as_bytes()).unwrap();
        assert_eq!(control["t"], Value::Float(300.0));

        let mut buf = Vec::new();
        write_to(&mut buf, &control, &FormatConfig::default()).unwrap();
        assert_eq!(String::from_utf8(buf).unwrap(), text);
    }

    #[test]
    fn test_json_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("control.json");

        let control: Control = "&crystal\n elements = 'Bi' 'Te'\n types = 1 1 2 2 2\n/"
            .parse()
            .unwrap();
        write_json(&path, &control).unwrap();
        assert_eq!(parse_json(&path).unwrap(), control);
    }
}
