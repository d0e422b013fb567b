//! Error Types
//!
//! This module defines the error type used throughout the bloom pass.
//!
//! # Overview
//!
//! [`BloomError`] covers three families of failure:
//! - **Configuration** errors: the compute program is absent or malformed, a
//!   required kernel is missing from it, or a dispatch was assembled with bindings
//!   that do not match the kernel signature. These are fatal for the whole
//!   effect; nothing is dispatched.
//! - **Invalid parameters**: zero-sized targets or out-of-range settings,
//!   rejected at entry.
//! - **Resource exhaustion**: a scratch texture could not be provided.
//!
//! No variant is transient, so nothing in this crate retries.
//!
//! # Usage
//!
//! All fallible APIs return [`Result<T>`], an alias for
//! `std::result::Result<T, BloomError>`.
//!
//! ```rust,ignore
//! use myth_bloom::errors::{BloomError, Result};
//!
//! fn build() -> Result<()> {
//!     Ok(())
//! }
//! ```

use thiserror::Error;

use crate::bloom::resource_ids::MipSlot;

/// The main error type for the bloom pass.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BloomError {
    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// No compute program was supplied to the pass.
    #[error("Bloom compute program is missing")]
    MissingProgram,

    /// A required kernel entry point is absent from the compute program.
    #[error("Kernel `{kernel}` not found in compute program `{program}`")]
    KernelNotFound {
        /// Label of the program that was searched.
        program: String,
        /// Entry point name that could not be resolved.
        kernel: &'static str,
    },

    /// The compute program source could not be reflected.
    #[error("Cannot reflect compute program `{program}`: {detail}")]
    ProgramReflection {
        /// Label of the program.
        program: String,
        /// What was malformed.
        detail: String,
    },

    /// A dispatch was assembled with bindings that do not match the
    /// kernel's declared signature.
    #[error("Binding mismatch for kernel `{kernel}`: {detail}")]
    BindingMismatch {
        /// Entry point name of the offending kernel.
        kernel: &'static str,
        /// Which binding was missing or unexpected.
        detail: String,
    },

    // ========================================================================
    // Parameter Errors
    // ========================================================================
    /// A size or setting is outside its valid range.
    #[error("Invalid bloom parameter: {0}")]
    InvalidParameter(String),

    // ========================================================================
    // Resource Errors
    // ========================================================================
    /// The allocator could not provide a scratch texture.
    #[error("Cannot allocate {slot} ({width}x{height}): {detail}")]
    ResourceExhaustion {
        /// Pyramid slot the texture was requested for.
        slot: MipSlot,
        /// Requested width in texels.
        width: u32,
        /// Requested height in texels.
        height: u32,
        /// Backend-specific reason.
        detail: String,
    },
}

impl BloomError {
    /// Returns `true` for errors caused by an unusable compute program or
    /// kernel binding setup (as opposed to per-frame parameter or memory
    /// problems).
    #[must_use]
    pub fn is_configuration_error(&self) -> bool {
        matches!(
            self,
            Self::MissingProgram
                | Self::KernelNotFound { .. }
                | Self::ProgramReflection { .. }
                | Self::BindingMismatch { .. }
        )
    }
}

/// Alias for `Result<T, BloomError>`.
pub type Result<T> = std::result::Result<T, BloomError>;
