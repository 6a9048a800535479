//! Error types for the rastjit backend.
//!
//! Using thiserror for more idiomatic error handling. There is no user-facing
//! failure mode here: every consumer is another in-process component, so an
//! `Err` simply aborts the current compile unit. Contract violations by a
//! pipeline-part generator (wrong register kind, double definition) are
//! programmer errors and panic via `assert!` instead of returning an error.

use crate::ir::Label;
use thiserror::Error;

/// Main error type for pipeline-stage compilation.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompileError {
    #[error("branch target {0} was declared but never bound to a block")]
    UnresolvedLabel(Label),
}

/// Result type alias for compile operations.
pub type CompileResult<T> = Result<T, CompileError>;
