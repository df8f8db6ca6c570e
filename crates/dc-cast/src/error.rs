use dc_core::types::Ty;
use thiserror::Error;

use crate::feasibility::Feasibility;

/// A violated precondition of unconditional cast emission.
///
/// These describe bugs in the caller, never in the program being compiled.
/// They are detected before any instruction is emitted.
#[derive(Debug, Error)]
pub enum CastError {
    #[error("cast from `{source_type}` to `{target_type}` is not guaranteed to succeed (classified {verdict})")]
    NotGuaranteed {
        source_type: Ty,
        target_type: Ty,
        verdict: Feasibility,
    },
    #[error("cannot remove optionality: source has {source_depth} optional layers, target has {target_depth}")]
    OptionalDepthUnderflow {
        source_depth: usize,
        target_depth: usize,
    },
    #[error("{role} is `{found}`, expected {expected}")]
    RepresentationMismatch {
        role: &'static str,
        expected: String,
        found: String,
    },
    #[error(transparent)]
    Verification(#[from] dc_core::Error),
}

pub type Result<T> = std::result::Result<T, CastError>;

impl CastError {
    pub(crate) fn mismatch(role: &'static str, expected: impl Into<String>, found: impl ToString) -> Self {
        CastError::RepresentationMismatch {
            role,
            expected: expected.into(),
            found: found.to_string(),
        }
    }
}
