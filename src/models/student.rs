use serde::{Deserialize, Serialize};
use std::str::FromStr;

pub type StudentId = i64;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Student {
    pub id: StudentId,
    #[serde(default)]
    pub firstname: String,
    #[serde(default)]
    pub lastname: String,
    #[serde(default)]
    pub mail: String,
    #[serde(default)]
    pub program: String,
    #[serde(default)]
    pub is_choosed: bool,
}

impl Student {
    /// Label used in the recipient picker.
    pub fn display_label(&self) -> String {
        format!("{} {} ({})", self.lastname, self.firstname, self.program)
    }
}

/// Broadcast partition of the roster by topic confirmation.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RecipientFilter {
    #[default]
    All,
    Confirmed,
    Unconfirmed,
}

impl RecipientFilter {
    pub fn matches(&self, student: &Student) -> bool {
        match self {
            RecipientFilter::All => true,
            RecipientFilter::Confirmed => student.is_choosed,
            RecipientFilter::Unconfirmed => !student.is_choosed,
        }
    }
}

impl FromStr for RecipientFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "all" => Ok(RecipientFilter::All),
            "confirmed" => Ok(RecipientFilter::Confirmed),
            "unconfirmed" => Ok(RecipientFilter::Unconfirmed),
            other => Err(format!("unknown recipient filter '{}'", other)),
        }
    }
}
