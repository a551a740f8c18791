//! One annotation run: resolve, apply, synthesize, strip, record.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info, info_span, warn};

use annotator_model::MetadataTree;
use annotator_rules::RuleSet;

use crate::applier::apply_overrides;
use crate::error::{AnnotateError, Result};
use crate::history::append_history_record;
use crate::identity::{self, CollectionIdentity};
use crate::synthesis::{SynthesizedScale, synthesize_dimension_scales};

/// Per-run settings supplied by the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnnotateOptions {
    /// Collection short name from the job source. Skips attribute probing.
    pub short_name: Option<String>,
    /// Append a provenance line to the root history attribute.
    pub record_history: bool,
    /// Timestamp for the history line; the current time when unset.
    pub timestamp: Option<DateTime<Utc>>,
    /// Fail instead of passing through files whose collection has no mission.
    pub strict: bool,
}

impl Default for AnnotateOptions {
    fn default() -> Self {
        Self {
            short_name: None,
            record_history: true,
            timestamp: None,
            strict: false,
        }
    }
}

/// Summary of what one run changed.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AnnotationReport {
    /// `None` when the collection could not be placed and the tree passed through.
    pub identity: Option<CollectionIdentity>,
    pub rules_version: Option<i64>,
    pub rules_fingerprint: String,
    pub updated: Vec<String>,
    pub created: Vec<String>,
    pub suppressed: Vec<String>,
    pub edits: usize,
    pub deletions: usize,
    pub synthesized: Vec<SynthesizedScale>,
    pub temporary_stripped: usize,
    pub history_recorded: bool,
}

impl AnnotationReport {
    /// True when the run changed nothing in the tree.
    pub fn is_unchanged(&self) -> bool {
        self.updated.is_empty()
            && self.created.is_empty()
            && self.synthesized.is_empty()
            && !self.history_recorded
    }
}

impl fmt::Display for AnnotationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.identity {
            Some(identity) => writeln!(f, "collection: {} ({})", identity.short_name, identity.mission)?,
            None => writeln!(f, "collection: unmapped, tree passed through")?,
        }
        let version = self
            .rules_version
            .map_or_else(|| "unversioned".to_string(), |version| format!("v{version}"));
        let fingerprint = self.rules_fingerprint.get(..12).unwrap_or(self.rules_fingerprint.as_str());
        writeln!(f, "rules: {version} ({fingerprint})")?;
        writeln!(
            f,
            "updated: {} paths, {} edits, {} deletions",
            self.updated.len(),
            self.edits,
            self.deletions
        )?;
        for path in &self.created {
            writeln!(f, "created: {path}")?;
        }
        for path in &self.suppressed {
            writeln!(f, "suppressed: {path}")?;
        }
        for scale in &self.synthesized {
            writeln!(
                f,
                "synthesized: {} ({} axis, start {}, {} values)",
                scale.path, scale.axis, scale.start_index, scale.length
            )?;
        }
        writeln!(f, "temporary attributes removed: {}", self.temporary_stripped)?;
        write!(
            f,
            "history: {}",
            if self.history_recorded { "recorded" } else { "unchanged" }
        )
    }
}

/// Applies a loaded rule set to metadata trees.
///
/// Holds the rules by reference so one load can serve many files.
#[derive(Debug, Clone, Copy)]
pub struct Annotator<'r> {
    rules: &'r RuleSet,
}

impl<'r> Annotator<'r> {
    pub fn new(rules: &'r RuleSet) -> Self {
        Self { rules }
    }

    /// Resolves the file's collection identity without changing the tree.
    pub fn resolve(&self, tree: &MetadataTree, options: &AnnotateOptions) -> Result<CollectionIdentity> {
        match &options.short_name {
            Some(short_name) => identity::identity_for(self.rules, short_name.trim().to_string()),
            None => identity::resolve(tree, self.rules),
        }
    }

    /// Runs the full pipeline over an owned tree.
    ///
    /// Any error aborts the run and the partially edited tree is dropped.
    pub fn annotate(
        &self,
        mut tree: MetadataTree,
        options: &AnnotateOptions,
    ) -> Result<(MetadataTree, AnnotationReport)> {
        let mut report = AnnotationReport {
            rules_version: self.rules.version,
            rules_fingerprint: self.rules.fingerprint().to_string(),
            ..AnnotationReport::default()
        };

        let identity = match self.resolve(&tree, options) {
            Ok(identity) => identity,
            Err(AnnotateError::UnmappedMission { short_name }) if !options.strict => {
                warn!(short_name = %short_name, "no mission for collection, leaving tree unchanged");
                return Ok((tree, report));
            }
            Err(error) => return Err(error),
        };

        let span = info_span!(
            "annotate",
            short_name = %identity.short_name,
            mission = %identity.mission
        );
        let _guard = span.enter();

        let outcome = apply_overrides(&mut tree, self.rules, &identity)?;
        report.synthesized = synthesize_dimension_scales(&mut tree)?;
        report.temporary_stripped = tree.strip_temporary_attributes();
        debug!(removed = report.temporary_stripped, "stripped temporary attributes");

        if options.record_history {
            append_history_record(&mut tree, options.timestamp.unwrap_or_else(Utc::now));
            report.history_recorded = true;
        }

        report.updated = outcome.updated;
        report.created = outcome.created;
        report.suppressed = outcome.suppressed;
        report.edits = outcome.edits;
        report.deletions = outcome.deletions;
        report.identity = Some(identity);

        info!(
            updated = report.updated.len(),
            created = report.created.len(),
            synthesized = report.synthesized.len(),
            "annotation complete"
        );
        Ok((tree, report))
    }
}

/// Convenience wrapper for a single run.
pub fn annotate(
    tree: MetadataTree,
    rules: &RuleSet,
    options: &AnnotateOptions,
) -> Result<(MetadataTree, AnnotationReport)> {
    Annotator::new(rules).annotate(tree, options)
}
