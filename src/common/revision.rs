//! Stores the current revision.

/// Git revision the crate was built from, if any.
pub const REVISION: Option<&str> = None;
