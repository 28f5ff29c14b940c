//! Shared fixtures for the disturbdb integration tests.

pub mod fixtures;
