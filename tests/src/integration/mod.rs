//! Integration tests spanning several crates.

pub mod flows;
pub mod scenarios;
