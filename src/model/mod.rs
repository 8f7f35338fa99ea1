// src/model/mod.rs
pub mod control;
pub mod schema;
pub mod structure;
pub mod value;

// Re-exports for cleaner imports
pub use control::{Control, Temperature};
pub use structure::{Atom, Structure};
pub use value::Value;
