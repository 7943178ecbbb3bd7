//! SQL construction.
//!
//! Everything user-supplied travels as a bound parameter; the only strings
//! ever concatenated into SQL are identifiers drawn from closed enums
//! (tables, columns, aliases) and `$n` placeholders.

pub mod predicate;
pub mod queries;

/// A value bound to a `$n` placeholder.
#[derive(Debug, Clone, PartialEq)]
pub enum Param {
    Text(String),
    TextArray(Vec<String>),
    Int(i64),
}

/// A fully built, parameterized query ready for the store to execute.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BuiltQuery {
    pub sql: String,
    pub params: Vec<Param>,
}

impl BuiltQuery {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind a parameter and return its placeholder, e.g. `$3`.
    pub fn bind(&mut self, param: Param) -> String {
        self.params.push(param);
        format!("${}", self.params.len())
    }

    pub fn push_sql(&mut self, fragment: &str) {
        self.sql.push_str(fragment);
    }
}
