//! Replacement rules derived from organization settings and a destination company.

use serde::{Deserialize, Serialize};

/// A literal `find -> replace` substitution.
///
/// `find` is never empty; use [`ReplacementRule::new`] to construct one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReplacementRule {
    find: String,
    replace: String,
}

impl ReplacementRule {
    /// Returns `None` when `find` is empty, since an empty needle has nothing to anchor on.
    pub fn new(find: impl Into<String>, replace: impl Into<String>) -> Option<Self> {
        let find = find.into();
        if find.is_empty() {
            return None;
        }
        Some(Self {
            find,
            replace: replace.into(),
        })
    }

    pub fn find(&self) -> &str {
        &self.find
    }

    pub fn replace(&self) -> &str {
        &self.replace
    }
}

/// The text currently baked into the shared template.
///
/// Empty fields are allowed and simply produce no rule.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SourceData {
    pub company_name: String,
    pub street: String,
    pub zip: String,
    pub city: String,
    pub contact_name: String,
}

/// The destination company a template is personalized for.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TargetCompany {
    pub name: Option<String>,
    pub street: Option<String>,
    pub zip: Option<String>,
    pub city: Option<String>,
    pub contact_name: Option<String>,
}

/// How rules are ordered before they are applied.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RuleOrder {
    /// Company name, street, postal code, city, contact name.
    #[default]
    Declared,
    /// Longest `find` first (stable), so a field that is a substring of another field cannot
    /// shadow it.
    LongestFirst,
}

/// Build the rule list for `target` using the declared field order.
pub fn build_replacement_rules(
    source: &SourceData,
    target: &TargetCompany,
) -> Vec<ReplacementRule> {
    build_replacement_rules_with_order(source, target, RuleOrder::Declared)
}

pub fn build_replacement_rules_with_order(
    source: &SourceData,
    target: &TargetCompany,
    order: RuleOrder,
) -> Vec<ReplacementRule> {
    let pairs = [
        (&source.company_name, &target.name),
        (&source.street, &target.street),
        (&source.zip, &target.zip),
        (&source.city, &target.city),
        (&source.contact_name, &target.contact_name),
    ];

    let mut rules: Vec<ReplacementRule> = pairs
        .into_iter()
        .filter_map(|(find, replace)| {
            ReplacementRule::new(find.as_str(), replace.as_deref().unwrap_or_default())
        })
        .collect();

    if order == RuleOrder::LongestFirst {
        // `sort_by` is stable, so equal-length fields keep their declared order.
        rules.sort_by(|a, b| b.find.chars().count().cmp(&a.find.chars().count()));
    }
    rules
}

/// Apply `rules` to `text` as one ordered pass of chained literal replacements.
///
/// Each rule sees the output of the previous one, so `[A -> B, B -> C]` turns `A` into `C`.
pub fn apply_rules(text: &str, rules: &[ReplacementRule]) -> String {
    let mut current = text.to_string();
    for rule in rules {
        if current.contains(rule.find.as_str()) {
            current = current.replace(rule.find.as_str(), &rule.replace);
        }
    }
    current
}
