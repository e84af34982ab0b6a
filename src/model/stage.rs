//! Version lifecycle stages.

use crate::error::{BodegaError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Lifecycle stage of a model version.
///
/// The four values form a closed set with no ordering: the registry accepts
/// any stage change, it records state rather than enforcing a workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum VersionStage {
    /// Freshly registered, no lifecycle label assigned.
    #[default]
    None,
    /// Candidate under evaluation.
    Staging,
    /// Serving live traffic.
    Production,
    /// Retired from use.
    Archived,
}

impl VersionStage {
    /// Get all valid stages.
    #[must_use]
    pub fn all() -> &'static [VersionStage] {
        &[
            VersionStage::None,
            VersionStage::Staging,
            VersionStage::Production,
            VersionStage::Archived,
        ]
    }
}

impl fmt::Display for VersionStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::None => "none",
            Self::Staging => "staging",
            Self::Production => "production",
            Self::Archived => "archived",
        };
        write!(f, "{s}")
    }
}

impl FromStr for VersionStage {
    type Err = BodegaError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "none" => Ok(Self::None),
            "staging" | "stage" => Ok(Self::Staging),
            "production" | "prod" => Ok(Self::Production),
            "archived" | "archive" => Ok(Self::Archived),
            _ => Err(BodegaError::Validation(format!("unknown stage: {s}"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_display() {
        assert_eq!(VersionStage::None.to_string(), "none");
        assert_eq!(VersionStage::Staging.to_string(), "staging");
        assert_eq!(VersionStage::Production.to_string(), "production");
        assert_eq!(VersionStage::Archived.to_string(), "archived");
    }

    #[test]
    fn test_stage_parse() {
        assert_eq!("none".parse::<VersionStage>().unwrap(), VersionStage::None);
        assert_eq!("None".parse::<VersionStage>().unwrap(), VersionStage::None);
        assert_eq!(
            "staging".parse::<VersionStage>().unwrap(),
            VersionStage::Staging
        );
        assert_eq!(
            "stage".parse::<VersionStage>().unwrap(),
            VersionStage::Staging
        );
        assert_eq!(
            "production".parse::<VersionStage>().unwrap(),
            VersionStage::Production
        );
        assert_eq!(
            "prod".parse::<VersionStage>().unwrap(),
            VersionStage::Production
        );
        assert_eq!(
            "archived".parse::<VersionStage>().unwrap(),
            VersionStage::Archived
        );
    }

    #[test]
    fn test_stage_parse_error() {
        assert!("invalid".parse::<VersionStage>().is_err());
        assert!("".parse::<VersionStage>().is_err());
    }

    #[test]
    fn test_stage_default_is_none() {
        assert_eq!(VersionStage::default(), VersionStage::None);
    }

    #[test]
    fn test_stage_display_parse_roundtrip() {
        for stage in VersionStage::all() {
            let parsed: VersionStage = stage.to_string().parse().unwrap();
            assert_eq!(parsed, *stage);
        }
    }

    #[test]
    fn test_serialization() {
        let stage = VersionStage::Production;
        let json = serde_json::to_string(&stage).unwrap();
        assert_eq!(json, "\"production\"");

        let deserialized: VersionStage = serde_json::from_str(&json).unwrap();
        assert_eq!(deserialized, VersionStage::Production);
    }

    #[test]
    fn test_all_stages() {
        let all = VersionStage::all();
        assert_eq!(all.len(), 4);
        assert!(all.contains(&VersionStage::None));
        assert!(all.contains(&VersionStage::Staging));
        assert!(all.contains(&VersionStage::Production));
        assert!(all.contains(&VersionStage::Archived));
    }
}
