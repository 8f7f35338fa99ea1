// src/physics/mod.rs
pub mod conversion;
pub mod kgrid;
