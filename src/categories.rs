use anyhow::{Context, Result};
use regex::Regex;
use serde::{Serialize, Serializer};
use std::fmt;
use std::path::Path;

use crate::config::{self, ConfigFile};

pub const RULES_FILE: ConfigFile = ConfigFile {
    file_name: "category_rules.txt",
    component: "category_rules",
    embedded: include_bytes!("../default_category_rules.txt"),
};

/// Account types that always collapse into [`Category::NewAccount`],
/// compared after trimming and lowercasing.
const NEW_ACCOUNT_TYPES: [&str; 2] = ["new", "conversion"];

pub const NEW_ACCOUNT_LABEL: &str = "New account";

/// Normalized account-type classification.
///
/// The set is open: anything that is not a new account keeps its own label.
/// Ordering puts new accounts first, then labels alphabetically.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Category {
    NewAccount,
    Other(String),
}

impl Category {
    pub fn from_label(label: &str) -> Self {
        if label == NEW_ACCOUNT_LABEL {
            Category::NewAccount
        } else {
            Category::Other(label.to_string())
        }
    }

    pub fn label(&self) -> &str {
        match self {
            Category::NewAccount => NEW_ACCOUNT_LABEL,
            Category::Other(label) => label,
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl Serialize for Category {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// A single `<regex> => <label>` line from the rules file.
#[derive(Debug, Clone)]
pub struct CategoryRule {
    pattern: Regex,
    category: Category,
}

impl CategoryRule {
    pub fn parse(line: &str) -> Result<Self> {
        let (pattern, label) = line
            .split_once("=>")
            .context("Expected `<regex> => <label>`")?;
        let label = label.trim();
        if label.is_empty() {
            anyhow::bail!("Rule has an empty category label");
        }
        let pattern = Regex::new(pattern.trim())
            .with_context(|| format!("Invalid regex pattern {:?}", pattern.trim()))?;

        Ok(Self {
            pattern,
            category: Category::from_label(label),
        })
    }
}

/// Classification function used by the normalizer.
///
/// The new/conversion collapse is always applied first. Configured rules are
/// matched against the trimmed, lowercased account type in file order. Types
/// no rule matches pass through as their trimmed original-case text.
#[derive(Debug, Clone, Default)]
pub struct CategoryRules {
    rules: Vec<CategoryRule>,
}

impl CategoryRules {
    pub fn builtin() -> Self {
        Self::default()
    }

    pub fn with_rules(rules: Vec<CategoryRule>) -> Self {
        Self { rules }
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn classify(&self, account_type: &str) -> Category {
        let trimmed = account_type.trim();
        let key = trimmed.to_lowercase();

        if NEW_ACCOUNT_TYPES.contains(&key.as_str()) {
            return Category::NewAccount;
        }

        self.rules
            .iter()
            .find(|rule| rule.pattern.is_match(&key))
            .map(|rule| rule.category.clone())
            .unwrap_or_else(|| Category::from_label(trimmed))
    }
}

pub fn load_category_rules(rules_file_path: Option<&Path>) -> Result<CategoryRules> {
    let rules = config::load_entries(&RULES_FILE, rules_file_path, CategoryRule::parse)?;
    Ok(CategoryRules::with_rules(rules))
}
