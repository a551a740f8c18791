#![deny(unsafe_code)]

pub mod document;
pub mod error;
pub mod hash;
pub mod paths;
pub mod ruleset;

pub use crate::document::{
    ApplicabilityRecord, AttributeRecord, MissionTable, OverrideRecord, RuleDocument,
};
pub use crate::error::RulesError;
pub use crate::paths::{RULES_ENV_VAR, default_rules_path};
pub use crate::ruleset::{Applicability, AttributeEdit, MissionPattern, Override, RuleSet};
