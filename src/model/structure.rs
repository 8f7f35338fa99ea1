// src/model/structure.rs

use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Atom {
    pub element: String,
    // Cartesian, Angstrom
    pub position: [f64; 3],
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Structure {
    // Lattice vectors: [a_vec, b_vec, c_vec], Angstrom
    pub lattice: [[f64; 3]; 3],
    pub atoms: Vec<Atom>,
}

impl Structure {
    /// Distinct element symbols in order of first appearance.
    pub fn species(&self) -> Vec<String> {
        let mut species: Vec<String> = Vec::new();
        for atom in &self.atoms {
            if !species.contains(&atom.element) {
                species.push(atom.element.clone());
            }
        }
        species
    }

    /// Lengths |a|, |b|, |c|.
    pub fn abc(&self) -> [f64; 3] {
        self.lattice
            .map(|v| (v[0] * v[0] + v[1] * v[1] + v[2] * v[2]).sqrt())
    }
}
