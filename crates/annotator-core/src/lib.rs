#![deny(unsafe_code)]

//! Rule resolution, override application and dimension scale synthesis.
//!
//! [`Annotator::annotate`] is the entry point: it resolves a file's
//! collection and mission, applies every matching override in declaration
//! order, synthesizes projection coordinate arrays from grid-mapping
//! geotransforms, strips temporary attributes, and records provenance.

pub mod annotate;
pub mod applier;
pub mod coerce;
pub mod error;
pub mod geotransform;
pub mod history;
pub mod identity;
pub mod matcher;
pub mod synthesis;

pub use crate::annotate::{AnnotateOptions, AnnotationReport, Annotator, annotate};
pub use crate::applier::{ApplyOutcome, apply_overrides};
pub use crate::error::{AnnotateError, ErrorKind, Result};
pub use crate::geotransform::{Axis, Geotransform};
pub use crate::identity::CollectionIdentity;
pub use crate::matcher::{collection_overrides, matching_overrides};
pub use crate::synthesis::{SynthesizedScale, synthesize_dimension_scales};
