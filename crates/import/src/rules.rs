use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

const DEFAULT_RULES: &str = include_str!("../rules/default.toml");

/// Keywords that send an expense description to one category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeywordRule {
    pub category: String,
    pub keywords: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct RuleFile {
    #[serde(default)]
    rules: Vec<KeywordRule>,
}

#[derive(Error, Debug)]
pub enum RulesError {
    #[error("Failed to read rule file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse rule TOML: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Rule for '{0}' has no keywords")]
    NoKeywords(String),
}

/// Internal pairing of a rule with its lowercased, longest-first keywords.
struct CompiledRule {
    category: String,
    keywords: Vec<String>,
}

/// One matching keyword of one category.
struct Hit<'a> {
    category: &'a str,
    keyword: &'a str,
}

/// Ordered keyword table. Earlier rules take priority over later ones.
pub struct KeywordRules {
    rules: Vec<CompiledRule>,
}

impl KeywordRules {
    pub fn new(rules: Vec<KeywordRule>) -> Result<Self, RulesError> {
        let compiled = rules
            .into_iter()
            .map(|rule| {
                let mut keywords: Vec<String> = rule
                    .keywords
                    .iter()
                    .map(|k| k.trim().to_lowercase())
                    .filter(|k| !k.is_empty())
                    .collect();
                if keywords.is_empty() {
                    return Err(RulesError::NoKeywords(rule.category));
                }
                // Longest first, by characters so Hangul and Latin compare evenly.
                keywords.sort_by(|a, b| b.chars().count().cmp(&a.chars().count()));
                keywords.dedup();
                Ok(CompiledRule {
                    category: rule.category,
                    keywords,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { rules: compiled })
    }

    pub fn from_toml(toml_content: &str) -> Result<Self, RulesError> {
        let file: RuleFile = toml::from_str(toml_content)?;
        Self::new(file.rules)
    }

    pub fn from_path(path: &Path) -> Result<Self, RulesError> {
        let content = std::fs::read_to_string(path).map_err(|source| RulesError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml(&content)
    }

    /// The rule table shipped with the crate.
    pub fn default_rules() -> Result<Self, RulesError> {
        Self::from_toml(DEFAULT_RULES)
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn categories(&self) -> impl Iterator<Item = &str> {
        self.rules.iter().map(|r| r.category.as_str())
    }

    /// Picks a category for `description` among `available` names.
    ///
    /// Every matching keyword of every available rule is a hit, in table
    /// order and longest-first within a rule. A hit whose keyword is a proper
    /// substring of another category's hit is dropped; the first surviving
    /// hit wins.
    pub fn match_category<'a>(&'a self, description: &str, available: &[&str]) -> Option<&'a str> {
        let text = description.to_lowercase();

        let hits: Vec<Hit<'a>> = self
            .rules
            .iter()
            .filter(|rule| available.contains(&rule.category.as_str()))
            .flat_map(|rule| {
                rule.keywords
                    .iter()
                    .filter(|k| text.contains(k.as_str()))
                    .map(move |k| Hit {
                        category: rule.category.as_str(),
                        keyword: k.as_str(),
                    })
            })
            .collect();

        hits.iter()
            .find(|hit| {
                !hits.iter().any(|other| {
                    other.category != hit.category
                        && other.keyword.len() > hit.keyword.len()
                        && other.keyword.contains(hit.keyword)
                })
            })
            .map(|hit| {
                tracing::debug!(
                    "Rule match '{}' -> {} (keyword '{}')",
                    description,
                    hit.category,
                    hit.keyword
                );
                hit.category
            })
    }
}
