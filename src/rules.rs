use std::collections::HashSet;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info};

use crate::config::EngineConfig;
use crate::error::{EngineError, Result};
use crate::pattern::{SourcePattern, TargetPattern};

const BUILTIN_RULES: &str = include_str!("../rules/default_rules.json");

fn automated_by_default() -> bool {
    true
}

/// A graph rewrite rule: where `sourcePattern` embeds, the `rewrite` nodes
/// are replaced by the `targetPattern` fragment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransformationRule {
    pub id: String,
    pub name: String,
    /// Source construct, e.g. "Java Class"
    #[serde(default)]
    pub source: String,
    /// Target construct, e.g. "TypeScript Interface"
    #[serde(default)]
    pub target: String,
    #[serde(default)]
    pub description: String,
    pub confidence: u32,
    #[serde(default = "automated_by_default")]
    pub automated: bool,
    /// Pattern may span several top-level declarations
    #[serde(default)]
    pub cross_declaration: bool,
    pub source_pattern: SourcePattern,
    pub target_pattern: TargetPattern,
}

impl TransformationRule {
    pub fn validate(&self) -> Result<()> {
        if self.id.trim().is_empty() {
            return Err(EngineError::rule_load("<unnamed>", "rule id is empty"));
        }
        if self.confidence > 100 {
            return Err(EngineError::rule_load(
                &self.id,
                format!("confidence {} is outside 0..=100", self.confidence),
            ));
        }
        self.source_pattern
            .validate()
            .map_err(|reason| EngineError::rule_load(&self.id, reason))?;
        self.target_pattern
            .validate(&self.source_pattern)
            .map_err(|reason| EngineError::rule_load(&self.id, reason))?;
        Ok(())
    }

    pub fn descriptor(&self) -> RuleDescriptor {
        RuleDescriptor {
            id: self.id.clone(),
            name: self.name.clone(),
            source: self.source.clone(),
            target: self.target.clone(),
            confidence: self.confidence,
            automated: self.automated,
        }
    }
}

/// Public summary of a rule, as listed at the JSON boundary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleDescriptor {
    pub id: String,
    pub name: String,
    pub source: String,
    pub target: String,
    pub confidence: u32,
    pub automated: bool,
}

/// Ordered, validated rule catalog. Immutable once built; share it with
/// `Arc` across threads.
#[derive(Debug, Clone)]
pub struct RuleRepository {
    rules: Vec<TransformationRule>,
}

impl RuleRepository {
    /// The embedded catalog (`rule-1` to `rule-5`).
    pub fn builtin() -> Result<Self> {
        Self::from_rules(parse_rules(BUILTIN_RULES)?)
    }

    /// Built-in rules plus the file named by `config.rules_path`, if any.
    pub fn load(config: &EngineConfig) -> Result<Self> {
        let repository = Self::builtin()?;
        match &config.rules_path {
            Some(path) => repository.with_file(path),
            None => Ok(repository),
        }
    }

    pub fn from_rules(rules: Vec<TransformationRule>) -> Result<Self> {
        let mut ids = HashSet::new();
        for rule in &rules {
            rule.validate()?;
            if !ids.insert(rule.id.clone()) {
                return Err(EngineError::rule_load(&rule.id, "duplicate rule id"));
            }
        }
        debug!(rules = rules.len(), "rule repository loaded");
        Ok(Self { rules })
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Self::from_rules(parse_rules(json)?)
    }

    /// Append the rules defined in a JSON file after the current ones.
    pub fn with_file(self, path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let extra = parse_rules(&content)?;
        info!(path = %path.display(), rules = extra.len(), "loading additional rules");
        let mut rules = self.rules;
        rules.extend(extra);
        Self::from_rules(rules)
    }

    pub fn list(&self) -> &[TransformationRule] {
        &self.rules
    }

    pub fn get(&self, id: &str) -> Option<&TransformationRule> {
        self.rules.iter().find(|r| r.id == id)
    }

    pub fn position(&self, id: &str) -> Option<usize> {
        self.rules.iter().position(|r| r.id == id)
    }

    /// Rules applied by bulk transformation, in catalog order.
    pub fn automated(&self) -> Vec<&TransformationRule> {
        self.rules.iter().filter(|r| r.automated).collect()
    }

    pub fn descriptors(&self) -> Vec<RuleDescriptor> {
        self.rules.iter().map(TransformationRule::descriptor).collect()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

/// Rules from JSON: either an array or `{"rules": [...]}`. Each entry is
/// decoded on its own so errors name the offending rule.
fn parse_rules(json: &str) -> Result<Vec<TransformationRule>> {
    let value: Value =
        serde_json::from_str(json).map_err(|e| EngineError::rule_load("<file>", e.to_string()))?;
    let entries = match value {
        Value::Array(entries) => entries,
        Value::Object(mut map) => match map.remove("rules") {
            Some(Value::Array(entries)) => entries,
            _ => {
                return Err(EngineError::rule_load(
                    "<file>",
                    "expected an array of rules or {\"rules\": [...]}",
                ));
            }
        },
        _ => {
            return Err(EngineError::rule_load("<file>", "expected an array of rules"));
        }
    };

    entries
        .into_iter()
        .enumerate()
        .map(|(i, entry)| {
            let label = entry
                .get("id")
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or_else(|| format!("#{}", i));
            serde_json::from_value(entry).map_err(|e| EngineError::rule_load(label, e.to_string()))
        })
        .collect()
}
