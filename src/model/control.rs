// src/model/control.rs

use crate::config::FormatConfig;
use crate::error::{ControlError, ParseError};
use crate::io::namelist::{self, Namelist};
use crate::model::schema::{self, Group};
use crate::model::Value;
use indexmap::IndexMap;
use serde::de::{self, Deserialize, Deserializer};
use serde::ser::{Serialize, Serializer};
use serde_json::{Map, Value as Json};
use std::ops::Index;
use std::path::Path;
use std::str::FromStr;

/// Class discriminator written by [`Control::as_dict`].
pub const CLASS_NAME: &str = "Control";

/// Temperature setting: one value (`t`) or a sweep (`t_min`, `t_max`, `t_step`).
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Temperature {
    Single(f64),
    Range { min: f64, max: f64, step: f64 },
}

impl Default for Temperature {
    fn default() -> Self {
        Temperature::Single(300.0)
    }
}

/// Contents of a ShengBTE CONTROL file.
///
/// An ordered map from lower-case key to [`Value`]. Recognized keys are
/// coerced to their schema kind on every way in (`from_file`, `from_dict`,
/// `insert`); anything else is kept as parsed.
///
/// Two controls are equal when they hold the same keys with equal values,
/// whatever the insertion order.
#[derive(Clone, Debug, Default)]
pub struct Control {
    params: IndexMap<String, Value>,
    // Unrecognized keys read from a file, and the group they came from
    sources: IndexMap<String, String>,
}

impl PartialEq for Control {
    fn eq(&self, other: &Self) -> bool {
        self.params == other.params
    }
}

impl Control {
    /// Starts a control with a q-point grid and a temperature, the two
    /// settings every run needs beyond the crystal itself.
    pub fn new(ngrid: [i64; 3], temperature: Temperature) -> Self {
        let mut params = IndexMap::new();
        params.insert("ngrid".to_string(), Value::IntList(ngrid.to_vec()));
        match temperature {
            Temperature::Single(t) => {
                params.insert("t".to_string(), Value::Float(t));
            }
            Temperature::Range { min, max, step } => {
                params.insert("t_min".to_string(), Value::Float(min));
                params.insert("t_max".to_string(), Value::Float(max));
                params.insert("t_step".to_string(), Value::Float(step));
            }
        }
        Self {
            params,
            sources: IndexMap::new(),
        }
    }

    // =======================
    //   MAP ACCESS
    // =======================

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.params.get(key.to_ascii_lowercase().as_str())
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Sets a field, coercing it to the schema kind of `key`.
    ///
    /// Returns the previous value. On a type error the control is unchanged.
    pub fn insert(
        &mut self,
        key: &str,
        value: impl Into<Value>,
    ) -> Result<Option<Value>, ParseError> {
        let key = key.to_ascii_lowercase();
        let value = schema::coerce(&key, value.into())?;
        Ok(self.params.insert(key, value))
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        let key = key.to_ascii_lowercase();
        self.sources.shift_remove(&key);
        self.params.shift_remove(&key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.params.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.params.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.params.len()
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    /// Required keys that are not set.
    pub fn missing_required(&self) -> Vec<&'static str> {
        schema::REQUIRED
            .iter()
            .copied()
            .filter(|k| !self.params.contains_key(*k))
            .collect()
    }

    // =======================
    //   NAMELIST
    // =======================

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ControlError> {
        crate::io::control::parse(path.as_ref())
    }

    pub fn from_reader(reader: impl std::io::Read) -> Result<Self, ControlError> {
        crate::io::control::parse_reader(reader)
    }

    /// Builds a control from parsed namelist groups.
    ///
    /// Later assignments win when a key appears in more than one group.
    pub fn from_namelist(nml: &Namelist) -> Result<Self, ParseError> {
        let mut control = Control::default();

        for group in &nml.groups {
            let known_group = Group::from_name(&group.name);
            if known_group.is_none() {
                log::warn!("Unrecognized namelist group '&{}'", group.name);
            }

            for (key, value) in &group.entries {
                if let (Some(param), Some(g)) = (schema::lookup(key), known_group) {
                    if param.group != g {
                        log::warn!(
                            "'{}' found in &{}, expected in &{}",
                            key,
                            group.name,
                            param.group.name()
                        );
                    }
                }
                control.insert(key, value.clone())?;
                if schema::lookup(key).is_none() {
                    control.sources.insert(key.clone(), group.name.clone());
                }
            }
        }

        log::debug!("Control built with {} parameters", control.len());
        Ok(control)
    }

    pub fn to_file(&self, path: impl AsRef<Path>) -> Result<(), ControlError> {
        self.to_file_with(path, &FormatConfig::default())
    }

    pub fn to_file_with(
        &self,
        path: impl AsRef<Path>,
        config: &FormatConfig,
    ) -> Result<(), ControlError> {
        crate::io::control::write(path.as_ref(), self, config)
    }

    pub fn write_to(
        &self,
        writer: impl std::io::Write,
        config: &FormatConfig,
    ) -> Result<(), ControlError> {
        crate::io::control::write_to(writer, self, config)
    }

    /// Renders the canonical CONTROL text.
    ///
    /// Groups come in the fixed order allocations, crystal, parameters,
    /// flags, and keys follow the schema order inside each group.
    /// Unrecognized keys read from a file go back to the group they came
    /// from, after the known keys; groups outside the schema follow `&flags`.
    /// Unrecognized keys set in code have no group and are left out.
    pub fn to_namelist_string(&self, config: &FormatConfig) -> String {
        let missing = self.missing_required();
        if !missing.is_empty() {
            log::warn!("Required parameter(s) not specified: {}", missing.join(", "));
        }

        let unplaced: Vec<&str> = self
            .keys()
            .filter(|k| schema::lookup(k).is_none() && !self.sources.contains_key(*k))
            .collect();
        if !unplaced.is_empty() {
            log::warn!("Unrecognized parameter(s) not written: {}", unplaced.join(", "));
        }

        let mut extra_groups: Vec<&str> = Vec::new();
        for name in self.sources.values() {
            if Group::from_name(name).is_none() && !extra_groups.contains(&name.as_str()) {
                extra_groups.push(name);
            }
        }

        let mut out = String::new();
        let known = Group::ALL.map(|g| {
            let entries: Vec<(&str, &Value)> = schema::params_in(g)
                .filter_map(|p| self.params.get(p.name).map(|v| (p.name, v)))
                .collect();
            (g.name(), entries)
        });
        let extra = extra_groups.into_iter().map(|name| (name, Vec::new()));

        for (name, mut entries) in known.into_iter().chain(extra) {
            entries.extend(self.passthrough(name));
            if entries.is_empty() {
                continue;
            }
            if !out.is_empty() && config.blank_line_between_groups {
                out.push('\n');
            }
            namelist::write_group(&mut out, name, &entries, config);
        }
        out
    }

    fn passthrough<'a>(&'a self, group: &'a str) -> impl Iterator<Item = (&'a str, &'a Value)> {
        self.sources
            .iter()
            .filter(move |(_, g)| g.as_str() == group)
            .filter_map(|(k, _)| self.params.get(k).map(|v| (k.as_str(), v)))
    }

    // =======================
    //   DICTIONARY
    // =======================

    /// Plain mapping of every field plus `@module`, `@class` and `@version`.
    pub fn as_dict(&self) -> Map<String, Json> {
        let mut dict = Map::new();
        dict.insert("@module".to_string(), Json::from(module_path!()));
        dict.insert("@class".to_string(), Json::from(CLASS_NAME));
        dict.insert("@version".to_string(), Json::from(env!("CARGO_PKG_VERSION")));
        for (key, value) in &self.params {
            dict.insert(key.clone(), value.to_json());
        }
        dict
    }

    /// Inverse of [`Control::as_dict`]. Keys starting with `@` are ignored.
    pub fn from_dict(dict: &Map<String, Json>) -> Result<Self, ParseError> {
        let mut control = Control::default();
        for (key, json) in dict {
            if key.starts_with('@') {
                continue;
            }
            let value = Value::from_json(key, json)?;
            control.insert(key, value)?;
        }
        Ok(control)
    }

    pub fn to_json(&self) -> String {
        Json::Object(self.as_dict()).to_string()
    }

    pub fn from_json(text: &str) -> Result<Self, ControlError> {
        let dict: Map<String, Json> = serde_json::from_str(text)?;
        Ok(Self::from_dict(&dict)?)
    }
}

impl FromStr for Control {
    type Err = ControlError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let nml = namelist::parse(s)?;
        Ok(Control::from_namelist(&nml)?)
    }
}

impl Index<&str> for Control {
    type Output = Value;

    /// Panics when `key` is not set, like `HashMap` indexing.
    fn index(&self, key: &str) -> &Value {
        match self.get(key) {
            Some(v) => v,
            None => panic!("no parameter '{}' in Control", key),
        }
    }
}

impl Serialize for Control {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.as_dict().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Control {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let dict = Map::<String, Json>::deserialize(deserializer)?;
        Control::from_dict(&dict).map_err(de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn si() -> Control {
        let dict = json!({
            "nelements": 1,
            "natoms": 2,
            "ngrid": [25, 25, 25],
            "norientations": 0,
            "lfactor": 0.1,
            "lattvec": [
                [0.0, 2.734363999, 2.734363999],
                [2.734363999, 0.0, 2.734363999],
                [2.734363999, 2.734363999, 0.0]
            ],
            "elements": "Si",
            "types": [1, 1],
            "positions": [[0.0, 0.0, 0.0], [0.25, 0.25, 0.25]],
            "scell": [5, 5, 5],
            "t": 500,
            "scalebroad": 0.5,
            "isotopes": false,
            "onlyharmonic": false,
            "nonanalytic": false,
            "nanowires": false
        });
        Control::from_dict(dict.as_object().unwrap()).unwrap()
    }

    #[test]
    fn test_new_sets_grid_and_temperature() {
        let c = Control::new([10, 10, 10], Temperature::default());
        assert_eq!(c["ngrid"], Value::IntList(vec![10, 10, 10]));
        assert_eq!(c["t"], Value::Float(300.0));

        let c = Control::new(
            [25, 25, 25],
            Temperature::Range {
                min: 100.0,
                max: 500.0,
                step: 50.0,
            },
        );
        assert!(!c.contains_key("t"));
        assert_eq!(c["t_max"], Value::Float(500.0));
    }

    #[test]
    fn test_index_and_get_are_case_insensitive() {
        let c = si();
        assert_eq!(c["T"], Value::Int(500));
        assert_eq!(c.get("LFACTOR"), Some(&Value::Float(0.1)));
        assert!(c.get("masses").is_none());
    }

    #[test]
    #[should_panic(expected = "no parameter 'masses'")]
    fn test_index_missing_key_panics() {
        let _ = &si()["masses"];
    }

    #[test]
    fn test_insert_coerces_and_rejects() {
        let mut c = si();
        assert_eq!(c.insert("lfactor", 1).unwrap(), Some(Value::Float(0.1)));
        assert_eq!(c["lfactor"], Value::Int(1));
        assert!(c.insert("lfactor", "1.0").is_err());

        let err = c.insert("ngrid", vec![1i64, 2]).unwrap_err();
        assert!(matches!(err, ParseError::InvalidLength { .. }));
        assert_eq!(c["ngrid"], Value::IntList(vec![25, 25, 25]));

        assert_eq!(c.remove("scalebroad"), Some(Value::Float(0.5)));
        assert!(!c.contains_key("scalebroad"));
    }

    #[test]
    fn test_equality_ignores_order() {
        let mut a = Control::default();
        a.insert("natoms", 2).unwrap();
        a.insert("nelements", 1).unwrap();

        let mut b = Control::default();
        b.insert("nelements", 1).unwrap();
        b.insert("natoms", 2).unwrap();

        assert_eq!(a, b);
        b.insert("natoms", 3).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_dict_round_trip() {
        let c = si();
        let dict = c.as_dict();
        assert_eq!(dict["@class"], json!("Control"));
        assert_eq!(dict["positions"], json!([[0.0, 0.0, 0.0], [0.25, 0.25, 0.25]]));
        assert_eq!(Control::from_dict(&dict).unwrap(), c);
    }

    #[test]
    fn test_dict_reproduces_input_mapping() {
        let input = json!({
            "natoms": 2,
            "elements": ["Si", "Ge"],
            "masses": [28.085, 72.63],
            "isotopes": true,
            "custom_key": "kept"
        });
        let c = Control::from_dict(input.as_object().unwrap()).unwrap();

        let mut out = c.as_dict();
        out.retain(|k, _| !k.starts_with('@'));
        assert_eq!(Json::Object(out), input);
    }

    #[test]
    fn test_dict_keeps_integer_literals_of_real_keys() {
        let input = json!({
            "lfactor": 1,
            "masses": [28, 72],
            "lattvec": [[5, 0, 0], [0, 5, 0], [0, 0, 5]],
            "t": 300
        });
        let c = Control::from_dict(input.as_object().unwrap()).unwrap();
        assert_eq!(c["masses"], Value::IntList(vec![28, 72]));

        let mut out = c.as_dict();
        out.retain(|k, _| !k.starts_with('@'));
        assert_eq!(Json::Object(out), input);

        let back: Control = c
            .to_namelist_string(&FormatConfig::default())
            .parse()
            .unwrap();
        assert_eq!(back, c);
    }

    #[test]
    fn test_json_round_trip() {
        let c = si();
        let text = c.to_json();
        let back = Control::from_json(&text).unwrap();
        assert_eq!(back, c);
        assert_eq!(back.to_json(), text);

        let via_serde: Control = serde_json::from_str(&serde_json::to_string(&c).unwrap()).unwrap();
        assert_eq!(via_serde, c);
    }

    #[test]
    fn test_from_dict_type_errors() {
        let bad = json!({ "natoms": 2.5 });
        assert!(matches!(
            Control::from_dict(bad.as_object().unwrap()),
            Err(ParseError::TypeMismatch { .. })
        ));

        let bad = json!({ "lattvec": [[1, 0, 0], [0, 1, 0]] });
        assert!(matches!(
            Control::from_dict(bad.as_object().unwrap()),
            Err(ParseError::InvalidLength { .. })
        ));

        assert!(matches!(
            Control::from_json("[1, 2]"),
            Err(ControlError::Json(_))
        ));
    }

    #[test]
    fn test_namelist_string_orders_by_schema() {
        let mut c = Control::default();
        c.insert("isotopes", true).unwrap();
        c.insert("t", 300).unwrap();
        c.insert("elements", vec!["Si".to_string()]).unwrap();
        c.insert("types", 1).unwrap();
        c.insert("custom", 1).unwrap();

        assert_eq!(
            c.to_namelist_string(&FormatConfig::default()),
            "&crystal\n    types = 1\n    elements(:) = 'Si'\n/\n\
             &parameters\n    t = 300\n/\n\
             &flags\n    isotopes = .true.\n/\n"
        );

        let spaced = FormatConfig {
            blank_line_between_groups: true,
            ..FormatConfig::default()
        };
        assert!(c.to_namelist_string(&spaced).contains("/\n\n&parameters"));
    }

    #[test]
    fn test_unrecognized_keys_return_to_their_group() {
        let text = "&allocations\n    nelements = 1\n    my_alloc = 4\n/\n\
                    &crystal\n    lfactor = 0.1\n/\n\
                    &extras\n    note = 'hi'\n/\n";
        let mut c: Control = text.parse().unwrap();
        assert_eq!(c["my_alloc"], Value::Int(4));
        assert_eq!(c.to_namelist_string(&FormatConfig::default()), text);

        c.insert("set_in_code", 1).unwrap();
        c.remove("note");
        let out = c.to_namelist_string(&FormatConfig::default());
        assert!(!out.contains("set_in_code"));
        assert!(!out.contains("&extras"));
        assert!(out.contains("    my_alloc = 4\n"));

        assert_eq!(Control::from_dict(&c.as_dict()).unwrap(), c);
    }

    #[test]
    fn test_from_str_and_missing_required() {
        let c: Control = "&allocations\n nelements = 1\n/".parse().unwrap();
        assert_eq!(c["nelements"], Value::Int(1));
        assert!(c.missing_required().contains(&"lattvec"));
        assert!(si().missing_required().is_empty());
    }

    #[test]
    fn test_parse_rejects_wrong_types() {
        let err = "&allocations\n ngrid = 25 25\n/".parse::<Control>().unwrap_err();
        assert!(matches!(
            err,
            ControlError::Parse(ParseError::InvalidLength { .. })
        ));
    }
}
