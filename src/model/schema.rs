// src/model/schema.rs
//
// Vocabulary of the ShengBTE CONTROL file.
//
// CONTROL has four namelist groups. Every recognized key belongs to exactly
// one group and has a fixed kind; the table order below is also the order
// in which keys are written back to disk.

use crate::error::ParseError;
use crate::model::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Group {
    Allocations,
    Crystal,
    Parameters,
    Flags,
}

impl Group {
    pub const ALL: [Group; 4] = [
        Group::Allocations,
        Group::Crystal,
        Group::Parameters,
        Group::Flags,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Group::Allocations => "allocations",
            Group::Crystal => "crystal",
            Group::Parameters => "parameters",
            Group::Flags => "flags",
        }
    }

    pub fn from_name(name: &str) -> Option<Group> {
        Group::ALL
            .into_iter()
            .find(|g| g.name().eq_ignore_ascii_case(name))
    }
}

/// Expected shape of a recognized key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    Bool,
    Int,
    /// Integer or real, kept as written (`t = 500` stays an integer).
    Number,
    /// Integer list of a fixed length.
    IntVector(usize),
    IntOrList,
    NumberOrList,
    StrOrList,
    /// Real-valued matrix; an all-integer matrix is kept as written.
    FloatMatrix { rows: Option<usize>, cols: usize },
    IntMatrix { cols: usize },
}

impl Kind {
    fn describe(self) -> String {
        match self {
            Kind::Bool => "logical".to_string(),
            Kind::Int => "integer".to_string(),
            Kind::Number => "integer or real".to_string(),
            Kind::IntVector(n) => format!("{} integers", n),
            Kind::IntOrList => "integer or integer list".to_string(),
            Kind::NumberOrList => "number or number list".to_string(),
            Kind::StrOrList => "string or string list".to_string(),
            Kind::FloatMatrix {
                rows: Some(r),
                cols,
            } => format!("{}x{} real matrix", r, cols),
            Kind::FloatMatrix { rows: None, cols } => format!("Nx{} real matrix", cols),
            Kind::IntMatrix { cols } => format!("Nx{} integer matrix", cols),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Param {
    pub name: &'static str,
    pub group: Group,
    pub kind: Kind,
}

const fn p(name: &'static str, group: Group, kind: Kind) -> Param {
    Param { name, group, kind }
}

pub const PARAMS: &[Param] = &[
    // &allocations
    p("nelements", Group::Allocations, Kind::Int),
    p("natoms", Group::Allocations, Kind::Int),
    p("ngrid", Group::Allocations, Kind::IntVector(3)),
    p("norientations", Group::Allocations, Kind::Int),
    // &crystal
    p("lfactor", Group::Crystal, Kind::Number),
    p("lattvec", Group::Crystal, Kind::FloatMatrix { rows: Some(3), cols: 3 }),
    p("types", Group::Crystal, Kind::IntOrList),
    p("elements", Group::Crystal, Kind::StrOrList),
    p("positions", Group::Crystal, Kind::FloatMatrix { rows: None, cols: 3 }),
    p("masses", Group::Crystal, Kind::NumberOrList),
    p("gfactors", Group::Crystal, Kind::NumberOrList),
    p("epsilon", Group::Crystal, Kind::FloatMatrix { rows: Some(3), cols: 3 }),
    p("scell", Group::Crystal, Kind::IntVector(3)),
    p("orientations", Group::Crystal, Kind::IntMatrix { cols: 3 }),
    // &parameters
    p("t", Group::Parameters, Kind::Number),
    p("t_min", Group::Parameters, Kind::Number),
    p("t_max", Group::Parameters, Kind::Number),
    p("t_step", Group::Parameters, Kind::Number),
    p("omega_max", Group::Parameters, Kind::Number),
    p("scalebroad", Group::Parameters, Kind::Number),
    p("rmin", Group::Parameters, Kind::Number),
    p("rmax", Group::Parameters, Kind::Number),
    p("dr", Group::Parameters, Kind::Number),
    p("maxiter", Group::Parameters, Kind::Int),
    p("nticks", Group::Parameters, Kind::Int),
    p("eps", Group::Parameters, Kind::Number),
    // &flags
    p("nonanalytic", Group::Flags, Kind::Bool),
    p("convergence", Group::Flags, Kind::Bool),
    p("isotopes", Group::Flags, Kind::Bool),
    p("autoisotopes", Group::Flags, Kind::Bool),
    p("nanowires", Group::Flags, Kind::Bool),
    p("onlyharmonic", Group::Flags, Kind::Bool),
    p("espresso", Group::Flags, Kind::Bool),
];

/// Keys ShengBTE refuses to run without.
pub const REQUIRED: &[&str] = &[
    "nelements",
    "natoms",
    "ngrid",
    "lattvec",
    "types",
    "elements",
    "positions",
    "scell",
];

pub fn lookup(name: &str) -> Option<&'static Param> {
    PARAMS.iter().find(|p| p.name == name)
}

pub fn params_in(group: Group) -> impl Iterator<Item = &'static Param> {
    PARAMS.iter().filter(move |p| p.group == group)
}

/// Coerces `value` to the kind registered for `key`.
///
/// Unrecognized keys pass through untouched.
pub fn coerce(key: &str, value: Value) -> Result<Value, ParseError> {
    match lookup(key) {
        Some(param) => coerce_to(key, param.kind, value),
        None => Ok(value),
    }
}

fn coerce_to(key: &str, kind: Kind, value: Value) -> Result<Value, ParseError> {
    let mismatch = |found: &Value| ParseError::TypeMismatch {
        key: key.to_string(),
        expected: kind.describe(),
        found: found.type_name().to_string(),
    };

    match (kind, value) {
        (Kind::Bool, v @ Value::Bool(_)) => Ok(v),
        (Kind::Int, v @ Value::Int(_)) => Ok(v),
        (Kind::Number, v @ (Value::Int(_) | Value::Float(_))) => Ok(v),

        (Kind::IntVector(n), Value::IntList(v)) => {
            check_len(key, n, v.len())?;
            Ok(Value::IntList(v))
        }

        (Kind::IntOrList, v @ (Value::Int(_) | Value::IntList(_))) => Ok(v),

        (
            Kind::NumberOrList,
            v @ (Value::Int(_) | Value::Float(_) | Value::IntList(_) | Value::FloatList(_)),
        ) => Ok(v),

        (Kind::StrOrList, v @ (Value::Str(_) | Value::StrList(_))) => Ok(v),

        (Kind::FloatMatrix { rows, cols }, Value::IntMatrix(m)) => {
            check_matrix(key, rows, cols, &m)?;
            Ok(Value::IntMatrix(m))
        }
        (Kind::FloatMatrix { rows, cols }, Value::FloatMatrix(m)) => {
            check_matrix(key, rows, cols, &m)?;
            Ok(Value::FloatMatrix(m))
        }

        (Kind::IntMatrix { cols }, Value::IntMatrix(m)) => {
            check_matrix(key, None, cols, &m)?;
            Ok(Value::IntMatrix(m))
        }

        (_, other) => Err(mismatch(&other)),
    }
}

fn check_len(key: &str, expected: usize, found: usize) -> Result<(), ParseError> {
    if expected == found {
        Ok(())
    } else {
        Err(ParseError::InvalidLength {
            key: key.to_string(),
            expected,
            found,
        })
    }
}

fn check_matrix<T>(
    key: &str,
    rows: Option<usize>,
    cols: usize,
    m: &[Vec<T>],
) -> Result<(), ParseError> {
    if let Some(r) = rows {
        check_len(key, r, m.len())?;
    }
    for row in m {
        check_len(key, cols, row.len())?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_required_key_is_known() {
        for key in REQUIRED {
            assert!(lookup(key).is_some(), "{} missing from table", key);
        }
    }

    #[test]
    fn test_group_names_round_trip() {
        for g in Group::ALL {
            assert_eq!(Group::from_name(g.name()), Some(g));
        }
        assert_eq!(Group::from_name("CRYSTAL"), Some(Group::Crystal));
        assert_eq!(Group::from_name("system"), None);
    }

    #[test]
    fn test_real_keys_keep_integer_literals() {
        assert_eq!(coerce("lfactor", Value::Int(1)).unwrap(), Value::Int(1));
        assert_eq!(
            coerce("masses", Value::IntList(vec![28, 72])).unwrap(),
            Value::IntList(vec![28, 72])
        );
        let lattvec = Value::IntMatrix(vec![vec![1, 0, 0], vec![0, 1, 0], vec![0, 0, 1]]);
        let kept = coerce("lattvec", lattvec.clone()).unwrap();
        assert_eq!(kept, lattvec);
        assert_eq!(kept.to_float_matrix().unwrap()[1], vec![0.0, 1.0, 0.0]);

        assert!(coerce("lattvec", Value::IntMatrix(vec![vec![1, 0, 0]])).is_err());
        assert!(coerce("masses", Value::Str("28".into())).is_err());
    }

    #[test]
    fn test_number_keeps_integer_temperature() {
        assert_eq!(coerce("t", Value::Int(500)).unwrap(), Value::Int(500));
        assert_eq!(coerce("t", Value::Float(300.5)).unwrap(), Value::Float(300.5));
    }

    #[test]
    fn test_reals_never_narrow() {
        let err = coerce("natoms", Value::Float(2.0)).unwrap_err();
        assert!(matches!(err, ParseError::TypeMismatch { .. }));
    }

    #[test]
    fn test_fixed_lengths_are_checked() {
        let err = coerce("ngrid", Value::IntList(vec![25, 25])).unwrap_err();
        assert_eq!(
            err,
            ParseError::InvalidLength {
                key: "ngrid".to_string(),
                expected: 3,
                found: 2
            }
        );
        assert!(coerce("ngrid", Value::Int(25)).is_err());
        assert!(coerce(
            "positions",
            Value::FloatMatrix(vec![vec![0.0, 0.0]])
        )
        .is_err());
    }

    #[test]
    fn test_unknown_keys_pass_through() {
        let v = Value::StrList(vec!["a".into(), "b".into()]);
        assert_eq!(coerce("my_extension", v.clone()).unwrap(), v);
    }
}
