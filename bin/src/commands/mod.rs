//! CLI command implementations.

pub(crate) mod replay;
pub(crate) mod resolutions;
pub(crate) mod simulate;
