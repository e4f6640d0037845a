//! CLI command implementations

pub(crate) mod aggregate;
pub(crate) mod common;
pub(crate) mod describe;
pub(crate) mod preview;
pub(crate) mod validate;
