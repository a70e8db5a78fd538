// Copyright (c) 2025 - Cowboy AI, Inc.
//! Aggregate kinds known to the vending domain

use serde::{Deserialize, Serialize};
use std::fmt;

/// The three event-sourced aggregate types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AggregateKind {
    Machine,
    Snack,
    Purchase,
}

impl AggregateKind {
    /// Lowercase name used in stream namespaces and subjects
    pub fn as_str(&self) -> &'static str {
        match self {
            AggregateKind::Machine => "machine",
            AggregateKind::Snack => "snack",
            AggregateKind::Purchase => "purchase",
        }
    }
}

impl fmt::Display for AggregateKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
