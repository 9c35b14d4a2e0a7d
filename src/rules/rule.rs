//! Rule records.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::capability::DiagnosticSeverity;

/// SonarQube rule severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RuleSeverity {
    /// Blocker.
    Blocker,
    /// Critical.
    Critical,
    /// Major.
    Major,
    /// Minor.
    Minor,
    /// Info.
    Info,
}

impl RuleSeverity {
    /// Name as written in rule files.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Blocker => "BLOCKER",
            Self::Critical => "CRITICAL",
            Self::Major => "MAJOR",
            Self::Minor => "MINOR",
            Self::Info => "INFO",
        }
    }
}

impl From<DiagnosticSeverity> for RuleSeverity {
    fn from(severity: DiagnosticSeverity) -> Self {
        match severity {
            DiagnosticSeverity::Error => Self::Critical,
            DiagnosticSeverity::Warning => Self::Major,
            DiagnosticSeverity::Info => Self::Minor,
            DiagnosticSeverity::Hidden => Self::Info,
        }
    }
}

impl fmt::Display for RuleSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether a rule can be instantiated more than once.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Cardinality {
    /// One instance.
    #[default]
    Single,
    /// Template rule.
    Multiple,
}

/// Rule lifecycle status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RuleStatus {
    /// Ready for use.
    #[default]
    Ready,
    /// Beta.
    Beta,
    /// Deprecated.
    Deprecated,
}

/// A rule as exposed by a generated plugin.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Rule {
    /// Rule key.
    pub key: String,
    /// Display name.
    pub name: String,
    /// Key used by the analyzer itself.
    pub internal_key: String,
    /// Description; may contain HTML.
    pub description: String,
    /// Severity.
    pub severity: RuleSeverity,
    /// Cardinality.
    pub cardinality: Cardinality,
    /// Status.
    pub status: RuleStatus,
    /// Tags.
    #[serde(default)]
    pub tags: Vec<String>,
}

impl Rule {
    /// Rule keys compare without regard to ASCII case.
    pub fn key_matches(&self, key: &str) -> bool {
        self.key.eq_ignore_ascii_case(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_mapping() {
        assert_eq!(RuleSeverity::from(DiagnosticSeverity::Error), RuleSeverity::Critical);
        assert_eq!(RuleSeverity::from(DiagnosticSeverity::Warning), RuleSeverity::Major);
        assert_eq!(RuleSeverity::from(DiagnosticSeverity::Info), RuleSeverity::Minor);
        assert_eq!(RuleSeverity::from(DiagnosticSeverity::Hidden), RuleSeverity::Info);
    }

    #[test]
    fn test_rule_serializes_with_sonar_names() {
        let rule = Rule {
            key: "CA1001".to_string(),
            name: "Types that own disposable fields should be disposable".to_string(),
            internal_key: "CA1001".to_string(),
            description: "<p>Implement IDisposable.</p>".to_string(),
            severity: RuleSeverity::Major,
            cardinality: Cardinality::Single,
            status: RuleStatus::Ready,
            tags: vec!["design".to_string()],
        };

        let json = serde_json::to_value(&rule).unwrap();
        assert_eq!(json["internalKey"], "CA1001");
        assert_eq!(json["severity"], "MAJOR");
        assert_eq!(json["cardinality"], "SINGLE");
        assert_eq!(json["status"], "READY");
        assert!(rule.key_matches("ca1001"));
    }
}
