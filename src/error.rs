//! Rich diagnostic error types for the corium engine.
//!
//! Each subsystem defines its own error type with miette `#[diagnostic]` derives,
//! providing error codes, help text, and source chains so callers know exactly
//! what went wrong and how to fix it.

use miette::Diagnostic;
use thiserror::Error;

/// Top-level error type for the corium engine.
///
/// Each variant wraps a subsystem-specific error, preserving the full diagnostic
/// chain (error codes, help text, source chains) through to the caller.
#[derive(Debug, Error, Diagnostic)]
pub enum CoriumError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Symbol(#[from] SymbolError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Relationship(#[from] RelationshipError),
}

// ---------------------------------------------------------------------------
// Symbol errors
// ---------------------------------------------------------------------------

/// Underlying cause of a failed module load.
///
/// Kept separate from [`SymbolError::Load`] so the load error always names the
/// location while the cause carries the detail.
#[derive(Debug, Error)]
pub enum LoadFailure {
    #[error("no module initializer registered for this location")]
    UnknownLocation,

    #[error("module initializer failed: {0}")]
    Init(#[source] Box<dyn std::error::Error + Send + Sync>),
}

#[derive(Debug, Error, Diagnostic)]
pub enum SymbolError {
    #[error("no lazy import registered under name \"{name}\"")]
    #[diagnostic(
        code(corium::symbol::unregistered),
        help(
            "Register the import first with `register_lazy_import(name, location, symbol)`. \
             This usually means the entity module declaring \"{name}\" never ran, \
             or the registry was reset after it did."
        )
    )]
    Unregistered { name: String },

    #[error("failed to load location \"{location}\"")]
    #[diagnostic(
        code(corium::symbol::load),
        help(
            "The location could not be loaded. Check that a module initializer is \
             registered under this exact location string and that it succeeds. \
             Load failures are never cached, so fixing the initializer and \
             resolving again will work."
        )
    )]
    Load {
        location: String,
        #[source]
        source: LoadFailure,
    },

    #[error("location \"{location}\" loaded, but exports no symbol \"{symbol}\"")]
    #[diagnostic(
        code(corium::symbol::missing),
        help(
            "The module exists but does not export the requested symbol. \
             Check the symbol name for typos, or export it from the module initializer."
        )
    )]
    MissingSymbol { location: String, symbol: String },
}

// ---------------------------------------------------------------------------
// Relationship errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum RelationshipError {
    #[error("no relationship \"{relationship}\" registered on owner {owner}")]
    #[diagnostic(
        code(corium::relationship::unknown),
        help(
            "Register it first with `register_relationship(owner, name, builder)`. \
             Owner keys are derived from the owner's defining location plus its \
             entity name, so the same entity re-declared elsewhere is a different owner."
        )
    )]
    Unknown { owner: String, relationship: String },

    #[error("lazy import \"{name}\" resolved, but the symbol is not an entity descriptor")]
    #[diagnostic(
        code(corium::relationship::invalid_target),
        help(
            "Relationship targets must be entity descriptors. Export the target \
             with `Module::export_entity`, or write a custom builder if the \
             relationship intentionally points at something else."
        )
    )]
    InvalidTarget { name: String },
}

/// Convenience alias for functions returning corium results.
pub type CoriumResult<T> = std::result::Result<T, CoriumError>;
