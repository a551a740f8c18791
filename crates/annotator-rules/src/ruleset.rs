//! Compiled, immutable rule set.
//!
//! Every regular expression is compiled once here; a malformed pattern fails
//! the load rather than surfacing later for a particular path.

use std::path::Path;

use regex::Regex;
use tracing::{debug, info};

use annotator_model::path::is_exact_path;
use annotator_model::{AttributeValue, is_temporary};

use crate::document::{OverrideRecord, RuleDocument};
use crate::error::RulesError;
use crate::hash::sha256_hex;

/// Regex over a collection short name, resolving to a mission label.
#[derive(Debug, Clone)]
pub struct MissionPattern {
    pub pattern: String,
    pub mission: String,
    regex: Regex,
}

impl MissionPattern {
    /// Unanchored search, unless the pattern anchors itself.
    pub fn is_match(&self, short_name: &str) -> bool {
        self.regex.is_match(short_name)
    }
}

/// Predicate deciding which files and paths an override applies to.
#[derive(Debug, Clone)]
pub struct Applicability {
    pub mission: String,
    pub short_name_path: String,
    pub variable_pattern: Option<String>,
    short_name: Regex,
    variable: Option<Regex>,
}

impl Applicability {
    /// The short name pattern must match the whole short name.
    pub fn short_name_matches(&self, short_name: &str) -> bool {
        self.short_name.is_match(short_name)
    }

    /// Unanchored search of the variable pattern in `path`; no pattern matches everything.
    pub fn path_matches(&self, path: &str) -> bool {
        self.variable
            .as_ref()
            .is_none_or(|regex| regex.is_match(path))
    }

    /// The literal path named by the variable pattern, when it has no regex syntax.
    pub fn exact_path(&self) -> Option<&str> {
        self.variable_pattern
            .as_deref()
            .filter(|pattern| is_exact_path(pattern))
    }
}

/// A single attribute edit. `None` deletes the attribute.
#[derive(Debug, Clone, PartialEq)]
pub struct AttributeEdit {
    pub name: String,
    pub value: Option<AttributeValue>,
}

impl AttributeEdit {
    pub fn set(name: impl Into<String>, value: impl Into<AttributeValue>) -> Self {
        Self {
            name: name.into(),
            value: Some(value.into()),
        }
    }

    pub fn delete(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: None,
        }
    }

    pub fn is_temporary(&self) -> bool {
        is_temporary(&self.name)
    }

    pub fn is_deletion(&self) -> bool {
        self.value.is_none()
    }
}

#[derive(Debug, Clone)]
pub struct Override {
    /// Position in the rule document; later overrides win on collisions.
    pub index: usize,
    pub applicability: Applicability,
    pub attributes: Vec<AttributeEdit>,
    pub description: Option<String>,
}

#[derive(Debug, Clone)]
pub struct RuleSet {
    pub identification: Option<String>,
    pub version: Option<i64>,
    pub collection_short_name_paths: Vec<String>,
    pub mission_patterns: Vec<MissionPattern>,
    pub overrides: Vec<Override>,
    fingerprint: String,
}

impl RuleSet {
    pub fn from_path(path: &Path) -> Result<Self, RulesError> {
        let bytes = std::fs::read(path).map_err(|error| RulesError::io(path, error))?;
        let rules = Self::from_slice(&bytes)?;
        info!(
            path = %path.display(),
            overrides = rules.overrides.len(),
            fingerprint = %rules.fingerprint,
            "loaded rule set"
        );
        Ok(rules)
    }

    pub fn from_json_str(json: &str) -> Result<Self, RulesError> {
        Self::from_slice(json.as_bytes())
    }

    pub fn from_slice(bytes: &[u8]) -> Result<Self, RulesError> {
        let document: RuleDocument = serde_json::from_slice(bytes)?;
        let mut rules = Self::from_document(document)?;
        rules.fingerprint = sha256_hex(bytes);
        Ok(rules)
    }

    /// Compiles an already-parsed document. The fingerprint covers its JSON form.
    pub fn from_document(document: RuleDocument) -> Result<Self, RulesError> {
        let fingerprint = sha256_hex(&serde_json::to_vec(&document)?);
        if document.collection_short_name_path.is_empty() {
            return Err(RulesError::invalid(
                "CollectionShortNamePath must list at least one attribute path",
            ));
        }

        let mission_patterns = document
            .mission
            .iter()
            .map(|(pattern, mission)| {
                Ok(MissionPattern {
                    pattern: pattern.to_string(),
                    mission: mission.to_string(),
                    regex: compile("Mission", pattern)?,
                })
            })
            .collect::<Result<Vec<_>, RulesError>>()?;

        let overrides = document
            .metadata_overrides
            .into_iter()
            .enumerate()
            .map(|(index, record)| compile_override(index, record))
            .collect::<Result<Vec<_>, RulesError>>()?;

        debug!(
            missions = mission_patterns.len(),
            overrides = overrides.len(),
            "compiled rule set"
        );

        Ok(Self {
            identification: document.identification,
            version: document.version,
            collection_short_name_paths: document.collection_short_name_path,
            mission_patterns,
            overrides,
            fingerprint,
        })
    }

    /// SHA-256 of the source document.
    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    /// First mission whose pattern matches the short name, in declaration order.
    pub fn mission_for(&self, short_name: &str) -> Option<&str> {
        self.mission_patterns
            .iter()
            .find(|pattern| pattern.is_match(short_name))
            .map(|pattern| pattern.mission.as_str())
    }
}

fn compile(field: &'static str, pattern: &str) -> Result<Regex, RulesError> {
    Regex::new(pattern).map_err(|source| RulesError::InvalidPattern {
        field,
        pattern: pattern.to_string(),
        source: Box::new(source),
    })
}

fn compile_override(index: usize, record: OverrideRecord) -> Result<Override, RulesError> {
    let OverrideRecord {
        applicability,
        attributes,
        description,
    } = record;

    if applicability.mission.trim().is_empty() {
        return Err(RulesError::invalid(format!(
            "override {index} has an empty Mission"
        )));
    }

    // Validate the pattern on its own so the error names what the user wrote.
    compile("ShortNamePath", &applicability.short_name_path)?;
    let short_name = compile(
        "ShortNamePath",
        &format!("^(?:{})$", applicability.short_name_path),
    )?;
    let variable = applicability
        .variable_pattern
        .as_deref()
        .map(|pattern| compile("VariablePattern", pattern))
        .transpose()?;

    let attributes = attributes
        .into_iter()
        .map(|attribute| {
            if attribute.name.trim().is_empty() {
                return Err(RulesError::invalid(format!(
                    "override {index} has an attribute with an empty Name"
                )));
            }
            Ok(AttributeEdit {
                name: attribute.name,
                value: attribute.value,
            })
        })
        .collect::<Result<Vec<_>, RulesError>>()?;

    Ok(Override {
        index,
        applicability: Applicability {
            mission: applicability.mission,
            short_name_path: applicability.short_name_path,
            variable_pattern: applicability.variable_pattern,
            short_name,
            variable,
        },
        attributes,
        description,
    })
}
