//! Mentor allocation engine and registration-ID counter.
//!
//! The allocation workflow filters a capacity-constrained mentor pool for each
//! student, ranks the survivors deterministically and commits one seat per
//! student, producing an explainability trace along the way. The counter
//! workflow mints stable registration identifiers for newly admitted students.

pub mod config;
pub mod error;
pub mod telemetry;
pub mod workflows;
