//! Error types for the constraint engine.
//!
//! Mirrors the split the rest of the crate relies on: queries never fail
//! loudly (they return `Option`), installers never throw except for genuine
//! caller misuse, which surfaces here as [`ShapeCtrError`].

use std::fmt;

/// Errors that can occur from misuse of the constraint engine's API.
///
/// These are not "this path is unsatisfiable" (that is `valid = false` on a
/// snapshot) — they are bugs in the caller, such as asking for a shape of
/// negative rank.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ShapeCtrError {
    /// `genShaped` was asked for a negative rank.
    NegativeRank {
        /// The rank that was requested.
        rank: i64,
    },
    /// `genEquality` (or another kind-sensitive factory) was given operands
    /// of mismatched or unsupported kinds.
    KindMismatch {
        /// What the caller expected.
        expected: &'static str,
        /// What was actually supplied.
        got: &'static str,
    },
    /// Two snapshots that do not share an id-manager were combined.
    ForeignIdManager,
}

impl fmt::Display for ShapeCtrError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NegativeRank { rank } => {
                write!(f, "genShaped: rank must be non-negative, got {rank}")
            }
            Self::KindMismatch { expected, got } => {
                write!(f, "expected operands of kind {expected}, got {got}")
            }
            Self::ForeignIdManager => {
                write!(f, "snapshots from two different id-managers were combined")
            }
        }
    }
}

impl std::error::Error for ShapeCtrError {}
