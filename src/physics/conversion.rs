// src/physics/conversion.rs
//
// Control <-> crystal Structure.
//
// CONTROL stores lattice vectors in units of `lfactor` nm and positions as
// fractional coordinates; Structure uses Angstrom and Cartesian positions.

use crate::error::{ControlError, ParseError};
use crate::model::{Atom, Control, Structure, Value};
use crate::physics::kgrid;
use crate::utils::linalg::{cart_to_frac, frac_to_cart, scale_lattice};

/// `lattvec` is written in Angstrom, so `lfactor = 0.1` turns it into nm.
const LFACTOR_ANGSTROM: f64 = 0.1;

impl Control {
    /// Builds a CONTROL for `structure`.
    ///
    /// Species are numbered in order of first appearance. With a
    /// `reciprocal_density`, `ngrid` is derived from it. `overrides` are
    /// applied last and may replace any generated key.
    pub fn from_structure(
        structure: &Structure,
        reciprocal_density: Option<f64>,
        overrides: &[(&str, Value)],
    ) -> Result<Control, ControlError> {
        let species = structure.species();

        let types: Vec<i64> = structure
            .atoms
            .iter()
            .map(|a| {
                species
                    .iter()
                    .position(|s| *s == a.element)
                    .map_or(0, |i| i as i64 + 1)
            })
            .collect();

        let positions = structure
            .atoms
            .iter()
            .map(|a| cart_to_frac(a.position, structure.lattice).map(|f| f.to_vec()))
            .collect::<Option<Vec<_>>>()
            .ok_or(ControlError::SingularLattice)?;

        let mut control = Control::default();
        control.insert("nelements", species.len() as i64)?;
        control.insert("natoms", structure.atoms.len() as i64)?;
        if let Some(kppa) = reciprocal_density {
            control.insert("ngrid", kgrid::automatic_density(structure, kppa).to_vec())?;
        }
        control.insert("norientations", 0)?;
        control.insert("lfactor", LFACTOR_ANGSTROM)?;
        control.insert("lattvec", structure.lattice)?;
        control.insert("elements", species)?;
        control.insert("types", types)?;
        control.insert("positions", positions)?;

        for (key, value) in overrides {
            control.insert(key, value.clone())?;
        }

        log::debug!(
            "Control generated for {} atoms ({} species)",
            structure.atoms.len(),
            control["nelements"].as_int().unwrap_or_default()
        );
        Ok(control)
    }

    /// Rebuilds the crystal described by `lattvec`, `types`, `elements`
    /// and `positions`.
    pub fn get_structure(&self) -> Result<Structure, ControlError> {
        let missing: Vec<String> = ["lattvec", "types", "elements", "positions"]
            .into_iter()
            .filter(|k| !self.contains_key(k))
            .map(String::from)
            .collect();
        if !missing.is_empty() {
            return Err(ControlError::MissingField(missing));
        }

        let mut lattvec = [[0.0; 3]; 3];
        for (dst, row) in lattvec.iter_mut().zip(&matrix(self, "lattvec")?) {
            *dst = vec3("lattvec", row)?;
        }
        let scale = match self.get("lfactor").and_then(Value::as_float) {
            Some(lfactor) => lfactor * 10.0,
            None => 1.0,
        };
        let lattice = scale_lattice(lattvec, scale);

        let elements = self["elements"]
            .to_str_vec()
            .ok_or_else(|| mismatch("elements", "string or string list", &self["elements"]))?;
        let types = self["types"]
            .to_int_vec()
            .ok_or_else(|| mismatch("types", "integer or integer list", &self["types"]))?;
        let positions = matrix(self, "positions")?;

        if types.len() != positions.len() {
            return Err(ParseError::InvalidLength {
                key: "types".to_string(),
                expected: positions.len(),
                found: types.len(),
            }
            .into());
        }

        let atoms = types
            .iter()
            .zip(&positions)
            .map(|(&t, frac)| {
                let element = usize::try_from(t)
                    .ok()
                    .and_then(|t| t.checked_sub(1))
                    .and_then(|i| elements.get(i))
                    .ok_or(ControlError::UnknownType {
                        index: t,
                        count: elements.len(),
                    })?;
                Ok(Atom {
                    element: element.clone(),
                    position: frac_to_cart(vec3("positions", frac)?, lattice),
                })
            })
            .collect::<Result<Vec<_>, ControlError>>()?;

        Ok(Structure { lattice, atoms })
    }
}

fn matrix(control: &Control, key: &str) -> Result<Vec<Vec<f64>>, ControlError> {
    let value = &control[key];
    value
        .to_float_matrix()
        .ok_or_else(|| mismatch(key, "real matrix", value))
}

fn vec3(key: &str, row: &[f64]) -> Result<[f64; 3], ParseError> {
    row.try_into().map_err(|_| ParseError::InvalidLength {
        key: key.to_string(),
        expected: 3,
        found: row.len(),
    })
}

fn mismatch(key: &str, expected: &str, found: &Value) -> ControlError {
    ParseError::TypeMismatch {
        key: key.to_string(),
        expected: expected.to_string(),
        found: found.type_name().to_string(),
    }
    .into()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bi2te3_like() -> Structure {
        let atom = |el: &str, position: [f64; 3]| Atom {
            element: el.to_string(),
            position,
        };
        Structure {
            lattice: [[4.0, 0.0, 0.0], [0.0, 4.0, 0.0], [0.0, 0.0, 10.0]],
            atoms: vec![
                atom("Te", [0.0, 0.0, 0.0]),
                atom("Bi", [2.0, 2.0, 2.5]),
                atom("Te", [0.0, 2.0, 5.0]),
            ],
        }
    }

    #[test]
    fn test_from_structure_fields() {
        let c = Control::from_structure(&bi2te3_like(), None, &[]).unwrap();
        assert_eq!(c["nelements"], Value::Int(2));
        assert_eq!(c["natoms"], Value::Int(3));
        assert_eq!(c["norientations"], Value::Int(0));
        assert_eq!(c["lfactor"], Value::Float(0.1));
        assert_eq!(
            c["elements"],
            Value::StrList(vec!["Te".to_string(), "Bi".to_string()])
        );
        assert_eq!(c["types"], Value::IntList(vec![1, 2, 1]));
        let bi = &c["positions"].as_float_matrix().unwrap()[1];
        for (x, want) in bi.iter().zip([0.5, 0.5, 0.25]) {
            assert!((x - want).abs() < 1e-12);
        }
        assert!(!c.contains_key("ngrid"));
    }

    #[test]
    fn test_from_structure_grid_and_overrides() {
        let c = Control::from_structure(
            &bi2te3_like(),
            Some(1000.0),
            &[("scell", Value::IntList(vec![4, 4, 2])), ("t", Value::Int(300))],
        )
        .unwrap();
        assert!(c.contains_key("ngrid"));
        assert_eq!(c["scell"], Value::IntList(vec![4, 4, 2]));
        assert_eq!(c["t"], Value::Int(300));

        let err = Control::from_structure(&bi2te3_like(), None, &[("scell", Value::Int(4))]);
        assert!(matches!(err, Err(ControlError::Parse(_))));
    }

    #[test]
    fn test_structure_round_trip() {
        let s = bi2te3_like();
        let back = Control::from_structure(&s, None, &[]).unwrap().get_structure().unwrap();

        assert_eq!(back.lattice, s.lattice);
        assert_eq!(back.atoms.len(), s.atoms.len());
        for (a, b) in back.atoms.iter().zip(&s.atoms) {
            assert_eq!(a.element, b.element);
            for i in 0..3 {
                assert!((a.position[i] - b.position[i]).abs() < 1e-10);
            }
        }
    }

    #[test]
    fn test_get_structure_errors() {
        let c = Control::new([25, 25, 25], Default::default());
        match c.get_structure() {
            Err(ControlError::MissingField(fields)) => assert_eq!(fields.len(), 4),
            other => panic!("unexpected result: {:?}", other),
        }

        let mut c = Control::from_structure(&bi2te3_like(), None, &[]).unwrap();
        c.insert("types", vec![1i64, 3, 1]).unwrap();
        assert!(matches!(
            c.get_structure(),
            Err(ControlError::UnknownType { index: 3, count: 2 })
        ));

        c.insert("types", vec![1i64, 2]).unwrap();
        assert!(matches!(
            c.get_structure(),
            Err(ControlError::Parse(ParseError::InvalidLength { .. }))
        ));
    }

    #[test]
    fn test_integer_lattice_is_read_as_real() {
        let dict = serde_json::json!({
            "lfactor": 1,
            "lattvec": [[1, 0, 0], [0, 1, 0], [0, 0, 2]],
            "elements": "Po",
            "types": 1,
            "positions": [[0, 0, 0]]
        });
        let c = Control::from_dict(dict.as_object().unwrap()).unwrap();
        assert!(matches!(c["lattvec"], Value::IntMatrix(_)));

        let s = c.get_structure().unwrap();
        assert_eq!(s.lattice[2], [0.0, 0.0, 20.0]);
        assert_eq!(s.atoms[0].element, "Po");
    }

    #[test]
    fn test_singular_lattice() {
        let mut s = bi2te3_like();
        s.lattice[2] = [4.0, 4.0, 0.0];
        assert!(matches!(
            Control::from_structure(&s, None, &[]),
            Err(ControlError::SingularLattice)
        ));
    }
}
