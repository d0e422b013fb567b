//! Compute pipeline creation.

pub mod bloom;
