//! Command implementations.

pub mod inspect;
pub mod restore;
