// SPDX-FileCopyrightText: 2026 Turnwatch Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the turnwatch response tracker.

use thiserror::Error;

/// The primary error type used across all turnwatch crates.
#[derive(Debug, Error)]
pub enum TurnwatchError {
    /// Configuration errors (invalid TOML, missing required fields, type mismatches).
    #[error("configuration error: {0}")]
    Config(String),

    /// Storage errors (database connection, query failure, migration failure).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Chat transport errors (connection failure, delivery failure, bad payload).
    #[error("channel error: {message}")]
    Channel {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// A store transition hit an already-applied or conflicting state, e.g.
    /// creating a turn for a key that already has an open turn.
    #[error("store conflict: {detail}")]
    Conflict { detail: String },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl TurnwatchError {
    /// Wrap an arbitrary error as a storage failure.
    pub fn storage<E>(source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        TurnwatchError::Storage {
            source: Box::new(source),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_variants_construct_and_display() {
        let errors = [
            TurnwatchError::Config("bad key".into()),
            TurnwatchError::storage(std::io::Error::other("disk")),
            TurnwatchError::Channel {
                message: "send failed".into(),
                source: None,
            },
            TurnwatchError::Conflict {
                detail: "open turn exists for key".into(),
            },
            TurnwatchError::Internal("unexpected".into()),
        ];
        for e in errors {
            assert!(!e.to_string().is_empty());
        }
    }

    #[test]
    fn conflict_message_carries_detail() {
        let e = TurnwatchError::Conflict {
            detail: "turn already open for (42, 7)".into(),
        };
        assert!(e.to_string().contains("(42, 7)"));
    }
}
