//! Test suites for driver setup and the dry-run binary.

pub(crate) mod support;
