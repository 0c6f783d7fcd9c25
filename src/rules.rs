// 🔧 Correction Rules - Rules as Data
// Ordered literal substring fixes for hardware labels

use anyhow::{Context as AnyhowContext, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

// ============================================================================
// RULE DEFINITION
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorrectionRule {
    /// Misspelled substring to look for (candidate rows are matched
    /// case-insensitively)
    pub search: String,

    /// Replacement text (substituted literally, case-sensitive)
    pub replace: String,

    /// Description/notes about this rule
    #[serde(default)]
    pub description: Option<String>,
}

impl CorrectionRule {
    pub fn new(search: &str, replace: &str) -> Self {
        CorrectionRule {
            search: search.to_string(),
            replace: replace.to_string(),
            description: None,
        }
    }

    /// Rewrite a label, replacing every literal occurrence of `search`.
    /// A case-insensitive candidate whose occurrences differ in case from
    /// `search` comes back unchanged.
    pub fn apply(&self, label: &str) -> String {
        label.replace(&self.search, &self.replace)
    }
}

// ============================================================================
// RULE SET
// ============================================================================

/// Ordered list of correction rules. Order is the caller's: each rule is
/// a full pass over the store before the next one starts.
#[derive(Debug, Clone, Default)]
pub struct RuleSet {
    rules: Vec<CorrectionRule>,
}

impl RuleSet {
    /// Create a new empty rule set
    pub fn new() -> Self {
        RuleSet { rules: Vec::new() }
    }

    /// Build a rule set from (search, replace) pairs, keeping their order
    pub fn from_pairs(pairs: &[(&str, &str)]) -> Self {
        RuleSet {
            rules: pairs
                .iter()
                .map(|(search, replace)| CorrectionRule::new(search, replace))
                .collect(),
        }
    }

    /// Load rules from a JSON file (an array of rule objects)
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read rules file: {:?}", path.as_ref()))?;

        let rules: Vec<CorrectionRule> =
            serde_json::from_str(&content).context("Failed to parse rules JSON")?;

        Ok(RuleSet { rules })
    }

    /// Append a single rule
    pub fn add_rule(&mut self, rule: CorrectionRule) {
        self.rules.push(rule);
    }

    /// Rules in application order
    pub fn rules(&self) -> &[CorrectionRule] {
        &self.rules
    }

    /// Get number of rules loaded
    pub fn rule_count(&self) -> usize {
        self.rules.len()
    }
}

// ============================================================================
// TESTS
// ============================================================================
