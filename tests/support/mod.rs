//! Shared helpers for integration tests.

#![allow(dead_code, clippy::unwrap_used)]

pub mod fake_catalog;
pub mod socket_guard;
