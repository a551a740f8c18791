use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Utc;
use tracing::{info, info_span};

use annotator_core::identity::identity_for;
use annotator_core::{
    AnnotateError, AnnotateOptions, AnnotationReport, Annotator, CollectionIdentity, ErrorKind,
    collection_overrides,
};
use annotator_rules::{Override, RuleSet, RulesError, default_rules_path};

use crate::document::{read_tree, write_tree};

/// Inputs of one `annotate` invocation.
#[derive(Debug, Clone, Default)]
pub struct AnnotateRequest {
    pub input: PathBuf,
    pub output: Option<PathBuf>,
    pub rules: Option<PathBuf>,
    pub short_name: Option<String>,
    pub record_history: bool,
    pub strict: bool,
    pub dry_run: bool,
}

/// Loads the rule set from an explicit path, the environment, or the bundled file.
pub fn load_rules(path: Option<&Path>) -> Result<RuleSet> {
    let path = path.map_or_else(default_rules_path, Path::to_path_buf);
    RuleSet::from_path(&path).with_context(|| format!("load rule set {}", path.display()))
}

pub fn run_annotate(request: &AnnotateRequest) -> Result<AnnotationReport> {
    let span = info_span!("file", input = %request.input.display());
    let _guard = span.enter();

    let rules = load_rules(request.rules.as_deref())?;
    let tree = read_tree(&request.input)?;
    let options = AnnotateOptions {
        short_name: request.short_name.clone(),
        record_history: request.record_history,
        timestamp: Some(Utc::now()),
        strict: request.strict,
    };
    let (tree, report) = Annotator::new(&rules)
        .annotate(tree, &options)
        .with_context(|| format!("annotate {}", request.input.display()))?;

    if request.dry_run {
        info!("dry run, annotated tree not written");
    } else {
        write_tree(&tree, request.output.as_deref())?;
    }
    Ok(report)
}

pub fn run_resolve(input: &Path, rules: Option<&Path>) -> Result<CollectionIdentity> {
    let rules = load_rules(rules)?;
    let tree = read_tree(input)?;
    Annotator::new(&rules)
        .resolve(&tree, &AnnotateOptions::default())
        .with_context(|| format!("resolve collection of {}", input.display()))
}

/// Overrides applying to `short_name`, optionally narrowed to one path.
pub fn select_overrides<'r>(
    rules: &'r RuleSet,
    short_name: &str,
    path: Option<&str>,
) -> Result<(CollectionIdentity, Vec<&'r Override>)> {
    let identity = identity_for(rules, short_name.to_string())?;
    let overrides = collection_overrides(rules, &identity)
        .into_iter()
        .filter(|rule| path.is_none_or(|path| rule.applicability.path_matches(path)))
        .collect();
    Ok((identity, overrides))
}

/// Process exit code for a failed command, one per annotation error kind.
pub fn exit_code(error: &anyhow::Error) -> i32 {
    let kind = error.chain().find_map(|cause| {
        if let Some(error) = cause.downcast_ref::<AnnotateError>() {
            Some(error.kind())
        } else if cause.is::<RulesError>() {
            Some(ErrorKind::Configuration)
        } else {
            None
        }
    });
    match kind {
        Some(ErrorKind::Configuration) => 2,
        Some(ErrorKind::HistoryParse) => 3,
        Some(ErrorKind::MissingReference) => 4,
        Some(ErrorKind::Validation) => 5,
        None => 1,
    }
}
