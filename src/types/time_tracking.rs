use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;
use serde_json::Value;

use crate::error::{JiraError, Result};

static DURATION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d+[mhdw]$").expect("valid duration pattern"));

/// Jira's short duration syntax: digits followed by one of m, h, d, w.
pub fn is_valid_duration(value: &str) -> bool {
    DURATION.is_match(value)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EstimateKind {
    Original,
    Remaining,
}

impl EstimateKind {
    pub fn wire_name(self) -> &'static str {
        match self {
            Self::Original => "originalEstimate",
            Self::Remaining => "remainingEstimate",
        }
    }
}

/// Estimates carried on an issue. Only one of the two is ever set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TimeTracking {
    #[serde(rename = "originalEstimate", skip_serializing_if = "Option::is_none")]
    pub original_estimate: Option<String>,
    #[serde(rename = "remainingEstimate", skip_serializing_if = "Option::is_none")]
    pub remaining_estimate: Option<String>,
}

impl TimeTracking {
    pub fn is_empty(&self) -> bool {
        self.original_estimate.is_none() && self.remaining_estimate.is_none()
    }

    /// Replace the estimates with a single validated one.
    pub fn set(&mut self, kind: EstimateKind, value: &str) -> Result<()> {
        if !is_valid_duration(value) {
            return Err(JiraError::InvalidDuration(value.to_string()));
        }
        *self = match kind {
            EstimateKind::Original => Self {
                original_estimate: Some(value.to_string()),
                remaining_estimate: None,
            },
            EstimateKind::Remaining => Self {
                original_estimate: None,
                remaining_estimate: Some(value.to_string()),
            },
        };
        Ok(())
    }

    /// Read `{"originalEstimate": "1h"}` style objects. Unknown keys are ignored.
    pub fn from_json(value: &Value) -> Option<Self> {
        let map = value.as_object()?;
        let get = |k: &str| map.get(k).and_then(Value::as_str).map(String::from);
        Some(Self {
            original_estimate: get(EstimateKind::Original.wire_name()),
            remaining_estimate: get(EstimateKind::Remaining.wire_name()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_duration_validation() {
        assert!(is_valid_duration("1m"));
        assert!(is_valid_duration("2h"));
        assert!(is_valid_duration("1d"));
        assert!(is_valid_duration("10w"));
        assert!(!is_valid_duration("1s"));
        assert!(!is_valid_duration("2x"));
        assert!(!is_valid_duration("0.1m"));
        assert!(!is_valid_duration("h"));
        assert!(!is_valid_duration(" 2h"));
    }

    #[test]
    fn test_estimates_are_mutually_exclusive() {
        let mut tt = TimeTracking::default();
        tt.set(EstimateKind::Original, "2h").unwrap();
        tt.set(EstimateKind::Remaining, "30m").unwrap();
        assert_eq!(tt.original_estimate, None);
        assert_eq!(tt.remaining_estimate.as_deref(), Some("30m"));
        assert_eq!(serde_json::to_value(&tt).unwrap(), json!({"remainingEstimate": "30m"}));
    }

    #[test]
    fn test_invalid_estimate_leaves_value_untouched() {
        let mut tt = TimeTracking::default();
        tt.set(EstimateKind::Original, "1h").unwrap();
        assert!(tt.set(EstimateKind::Original, "2x").is_err());
        assert_eq!(tt.original_estimate.as_deref(), Some("1h"));
    }
}
