//! Named pipeline steps.
//!
//! Every statement the pipeline runs is wrapped in a [`Step`] so that a
//! failure can be reported by name instead of by list position.

use std::fmt;

/// Pipeline phase a step belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    DropTables,
    CreateTables,
    LoadStaging,
    Transform,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DropTables => "drop_tables",
            Self::CreateTables => "create_tables",
            Self::LoadStaging => "load_staging",
            Self::Transform => "transform",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single statement with its bound parameters.
///
/// `sql` carries `?` placeholders; `binds` fills them in order. Values that
/// must stay out of logs (role ARNs, bucket URLs) only ever live in `binds`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Step {
    pub name: String,
    pub phase: Phase,
    pub sql: String,
    pub binds: Vec<String>,
}

impl Step {
    pub fn new(phase: Phase, name: impl Into<String>, sql: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            phase,
            sql: sql.into(),
            binds: Vec::new(),
        }
    }

    pub fn bind(mut self, value: impl Into<String>) -> Self {
        self.binds.push(value.into());
        self
    }

    /// Number of `?` placeholders in the statement text.
    pub fn placeholder_count(&self) -> usize {
        self.sql.matches('?').count()
    }
}
