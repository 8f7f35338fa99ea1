// src/io/namelist/mod.rs
//
// Fortran namelist subset used by ShengBTE:
//
//   &group
//       key = 1, 2, 3
//       matrix(:,1) = 0.0, 0.5, 0.5   ! comment
//   /
//
// The parser is schema-free: it infers a Value for every key and leaves
// coercion to the caller.

mod parser;
mod writer;

pub use parser::parse;
pub use writer::{format_real, write_group};

use crate::model::Value;
use indexmap::IndexMap;

#[derive(Debug, Clone, PartialEq, Default)]
pub struct NamelistGroup {
    /// Lower-cased group name, without the leading `&`.
    pub name: String,
    /// Lower-cased keys in order of first assignment.
    pub entries: IndexMap<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Namelist {
    pub groups: Vec<NamelistGroup>,
}

impl Namelist {
    pub fn group(&self, name: &str) -> Option<&NamelistGroup> {
        self.groups.iter().find(|g| g.name == name)
    }
}
