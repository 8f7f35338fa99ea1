// src/physics/kgrid.rs

use crate::model::Structure;

/// q-point grid for a target density of points per reciprocal atom.
///
/// `kppa` is spread over the atoms of the cell and split across the three
/// directions in inverse proportion to the lattice vector lengths:
/// `n_i = floor(max(mult / |a_i|, 1))` with `mult = (kppa / natoms * |a||b||c|)^(1/3)`.
pub fn automatic_density(structure: &Structure, kppa: f64) -> [i64; 3] {
    let mut kppa = kppa;

    // A perfect cube would land exactly on an integer and floor could drop
    // a point to rounding noise
    if ((kppa.cbrt() + 0.5).floor().powi(3) - kppa).abs() < 1.0 {
        kppa += kppa * 0.01;
    }

    let natoms = structure.atoms.len().max(1) as f64;
    let [a, b, c] = structure.abc();
    let mult = (kppa / natoms * a * b * c).cbrt();

    [a, b, c].map(|len| (mult / len).max(1.0).floor() as i64)
}
