//! # RoboCloud Test Suite
//!
//! Cross-crate tests for the control plane.
//!
//! ## Structure
//!
//! ```text
//! tests/src/
//! └── integration/
//!     ├── scenarios.rs   # container, interface and connection rules
//!     └── flows.rs       # end to end through the master runtime
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test -p rc-tests
//! cargo test -p rc-tests integration::flows::
//! ```

#![allow(dead_code)]

pub mod integration;
