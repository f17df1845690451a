use std::fmt::Display;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Plan {
    Solo,
    Team,
}

impl Plan {
    pub fn as_str(&self) -> &'static str {
        match self {
            Plan::Solo => "solo",
            Plan::Team => "team",
        }
    }

    pub fn from_str(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "solo" => Some(Plan::Solo),
            "team" => Some(Plan::Team),
            _ => None,
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Plan::Solo => "Solo",
            Plan::Team => "Team",
        }
    }
}

impl Display for Plan {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
