//! Deterministic domain tools invoked during analysis.
//!
//! Each tool is a total function returning a serializable record; failures
//! the caller should see (unknown role, division by zero) are part of the
//! record rather than a Rust error.

pub mod calculator;
pub mod keyword;
pub mod roles;

pub use calculator::{Calculation, Evaluation};
pub use keyword::{DEFAULT_KEYWORD, KeywordCount, count_keyword};
pub use roles::{ROLE_TABLE, RoleLookup, RolePermission, role_lookup, role_names};
