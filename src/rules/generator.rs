//! Turning discovered analyzers into rules.

use std::collections::HashSet;
use std::sync::Arc;

use super::{Cardinality, Rule, RuleSeverity, RuleStatus};
use crate::capability::{CapabilityInstance, DiagnosticDescriptor};
use crate::core::Logger;

/// Builds one rule per diagnostic exposed by a set of analyzers.
pub struct RuleGenerator {
    logger: Arc<dyn Logger>,
}

impl RuleGenerator {
    /// Create a generator.
    pub fn new(logger: Arc<dyn Logger>) -> Self {
        Self { logger }
    }

    /// Generate rules for every diagnostic supported by `instances`.
    ///
    /// Rules come out in analyzer order. When two diagnostics share a key
    /// (ignoring case) only the first is kept.
    pub fn generate(&self, instances: &[CapabilityInstance]) -> Vec<Rule> {
        let mut seen = HashSet::new();
        let mut rules = Vec::new();

        for instance in instances {
            for diagnostic in instance.analyzer().supported_diagnostics() {
                if !seen.insert(diagnostic.id.to_ascii_lowercase()) {
                    self.logger.warn(format_args!(
                        "Duplicate rule key '{}' from {}; keeping the first definition",
                        diagnostic.id,
                        instance.type_name()
                    ));
                    continue;
                }
                rules.push(rule_from_diagnostic(&diagnostic));
            }
        }

        self.logger.debug(format_args!("Generated {} rule(s)", rules.len()));
        rules
    }
}

/// Map a single diagnostic to a rule.
pub fn rule_from_diagnostic(diagnostic: &DiagnosticDescriptor) -> Rule {
    let mut description = if diagnostic.description.trim().is_empty() {
        diagnostic.title.clone()
    } else {
        diagnostic.description.clone()
    };

    if let Some(link) = diagnostic.help_link.as_deref().filter(|l| !l.trim().is_empty()) {
        description.push_str(&format!("\n<p>Help link: <a href=\"{link}\">{link}</a></p>"));
    }

    Rule {
        key: diagnostic.id.clone(),
        name: diagnostic.title.clone(),
        internal_key: diagnostic.id.clone(),
        description,
        severity: RuleSeverity::from(diagnostic.default_severity),
        cardinality: Cardinality::Single,
        status: RuleStatus::Ready,
        tags: diagnostic.custom_tags.iter().map(|tag| normalize_tag(tag)).collect(),
    }
}

fn normalize_tag(tag: &str) -> String {
    tag.trim().to_lowercase().replace(' ', "-")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::DiagnosticSeverity;

    #[test]
    fn test_rule_from_diagnostic() {
        let diagnostic =
            DiagnosticDescriptor::new("EX001", "Example title", DiagnosticSeverity::Error)
                .with_description("Example description")
                .with_tag("Code Smell")
                .with_tag("Telemetry");

        let rule = rule_from_diagnostic(&diagnostic);
        assert_eq!(rule.key, "EX001");
        assert_eq!(rule.internal_key, "EX001");
        assert_eq!(rule.name, "Example title");
        assert_eq!(rule.description, "Example description");
        assert_eq!(rule.severity, RuleSeverity::Critical);
        assert_eq!(rule.tags, vec!["code-smell", "telemetry"]);
    }

    #[test]
    fn test_description_falls_back_to_title_and_appends_link() {
        let diagnostic =
            DiagnosticDescriptor::new("EX002", "Only a title", DiagnosticSeverity::Hidden)
                .with_help_link("https://example.org/EX002");

        let rule = rule_from_diagnostic(&diagnostic);
        assert!(rule.description.starts_with("Only a title"));
        assert!(rule.description.contains("https://example.org/EX002"));
        assert_eq!(rule.severity, RuleSeverity::Info);
    }

    #[test]
    fn test_normalize_tag() {
        assert_eq!(normalize_tag(" Best Practice "), "best-practice");
    }
}
