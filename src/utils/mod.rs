//! Small shared helpers.

pub mod fmt;
