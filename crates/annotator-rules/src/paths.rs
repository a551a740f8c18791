//! Rule set path resolution.

use std::path::PathBuf;

/// Environment variable for overriding the rule set location.
pub const RULES_ENV_VAR: &str = "METADATA_ANNOTATOR_RULES";

const DEFAULT_RULES_FILE: &str = "metadata_annotator_rules.json";

/// Get the rule set document path.
///
/// Resolution order:
/// 1. `METADATA_ANNOTATOR_RULES` environment variable
/// 2. `rules/metadata_annotator_rules.json` relative to the workspace root
pub fn default_rules_path() -> PathBuf {
    if let Ok(path) = std::env::var(RULES_ENV_VAR) {
        return PathBuf::from(path);
    }
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("../../rules")
        .join(DEFAULT_RULES_FILE)
}
