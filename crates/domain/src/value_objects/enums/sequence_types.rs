use std::fmt::Display;

use serde::{Deserialize, Serialize};

/// Mollie `sequenceType`: `first` sets up a SEPA mandate, `recurring` is charged against one.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SequenceType {
    Oneoff,
    First,
    Recurring,
}

impl SequenceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SequenceType::Oneoff => "oneoff",
            SequenceType::First => "first",
            SequenceType::Recurring => "recurring",
        }
    }

    pub fn from_str(value: &str) -> Option<Self> {
        match value {
            "oneoff" => Some(SequenceType::Oneoff),
            "first" => Some(SequenceType::First),
            "recurring" => Some(SequenceType::Recurring),
            _ => None,
        }
    }
}

impl Display for SequenceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
