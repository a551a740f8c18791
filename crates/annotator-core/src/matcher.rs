//! Override applicability.

use annotator_rules::{Override, RuleSet};

use crate::identity::CollectionIdentity;

/// True when the override's mission and short name clauses accept the file.
pub fn matches_collection(rule: &Override, identity: &CollectionIdentity) -> bool {
    rule.applicability.mission == identity.mission
        && rule.applicability.short_name_matches(&identity.short_name)
}

/// All three clauses: mission equality, full short name match, path search.
pub fn matches(rule: &Override, path: &str, identity: &CollectionIdentity) -> bool {
    matches_collection(rule, identity) && rule.applicability.path_matches(path)
}

/// Overrides that apply to the file at all, in declaration order.
pub fn collection_overrides<'r>(
    rules: &'r RuleSet,
    identity: &CollectionIdentity,
) -> Vec<&'r Override> {
    rules
        .overrides
        .iter()
        .filter(|rule| matches_collection(rule, identity))
        .collect()
}

/// Overrides that apply to `path`, in declaration order.
pub fn matching_overrides<'r>(
    rules: &'r RuleSet,
    path: &str,
    identity: &CollectionIdentity,
) -> Vec<&'r Override> {
    rules
        .overrides
        .iter()
        .filter(|rule| matches(rule, path, identity))
        .collect()
}
