//! Reader and writer for the ShengBTE `CONTROL` file.
//!
//! `CONTROL` is a Fortran namelist with four groups (`&allocations`,
//! `&crystal`, `&parameters`, `&flags`). [`Control`] holds its contents as a
//! typed, ordered map, reads and writes the namelist text, and converts to
//! and from a JSON dictionary.
//!
//! ```no_run
//! use shengbte_control::Control;
//!
//! let control = Control::from_file("CONTROL")?;
//! assert_eq!(control["natoms"].as_int(), Some(2));
//! control.to_file("CONTROL.new")?;
//! # Ok::<(), shengbte_control::ControlError>(())
//! ```

pub mod config;
pub mod error;
pub mod io;
pub mod model;
pub mod physics;
pub mod utils;

pub use config::{FormatConfig, MatrixIndex};
pub use error::{ControlError, ParseError};
pub use model::{Atom, Control, Structure, Temperature, Value};
