// src/utils/linalg.rs

use nalgebra::{Matrix3, Vector3};

/// Lattice as a row matrix [[ax, ay, az], [bx, by, bz], [cx, cy, cz]]
fn lattice_matrix(lattice: [[f64; 3]; 3]) -> Matrix3<f64> {
  Matrix3::from_row_slice(&lattice.concat())
}

/// Convert fractional coordinates to Cartesian using lattice matrix
///
/// # Formula
/// ```text
/// Cartesian = Lattice^T × Fractional
/// ```
pub fn frac_to_cart(frac: [f64; 3], lattice: [[f64; 3]; 3]) -> [f64; 3] {
  let cart = lattice_matrix(lattice).transpose() * Vector3::from(frac);
  [cart.x, cart.y, cart.z]
}

/// Convert Cartesian coordinates to fractional, or None if the lattice is singular
///
/// # Formula
/// ```text
/// Fractional = (Lattice^T)^-1 × Cartesian
/// ```
pub fn cart_to_frac(cart: [f64; 3], lattice: [[f64; 3]; 3]) -> Option<[f64; 3]> {
  let inv = lattice_matrix(lattice).transpose().try_inverse()?;
  let frac = inv * Vector3::from(cart);
  Some([frac.x, frac.y, frac.z])
}

/// Scales every lattice vector by `factor`
pub fn scale_lattice(lattice: [[f64; 3]; 3], factor: f64) -> [[f64; 3]; 3] {
  lattice.map(|v| v.map(|x| x * factor))
}
