//! # Minimap Error Types
//!
//! Errors are reserved for registration, configuration and explicit edits
//! of indexed data. Per-frame queries never return these; they report
//! "not found" through `Option` or a flag instead.

use thiserror::Error;

/// Errors that can occur in the minimap engine.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MinimapError {
    /// The registry arena for this kind of object is full.
    #[error("registry full: {kind} capacity {capacity} reached")]
    RegistryFull {
        /// Kind of object being registered.
        kind: &'static str,
        /// Configured capacity.
        capacity: usize,
    },

    /// A handle refers to an object that was already unregistered.
    #[error("stale {kind} handle: slot {index}")]
    StaleHandle {
        /// Kind of object the handle refers to.
        kind: &'static str,
        /// Slot index in the arena.
        index: usize,
    },

    /// A background level index is out of range.
    #[error("level {index} out of range: background has {count} levels")]
    LevelOutOfRange {
        /// Requested level index.
        index: usize,
        /// Number of levels the background has.
        count: usize,
    },

    /// Configuration failed to parse or validate.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Configuration file could not be read.
    #[error("failed to read configuration: {0}")]
    ConfigIo(String),
}

/// Result type for minimap operations.
pub type MinimapResult<T> = Result<T, MinimapError>;
