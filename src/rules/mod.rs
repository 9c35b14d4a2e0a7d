//! SonarQube rule records generated from analyzer diagnostics.

mod generator;
mod rule;

pub use generator::{rule_from_diagnostic, RuleGenerator};
pub use rule::{Cardinality, Rule, RuleSeverity, RuleStatus};
