//! Tag text normalization.
//!
//! The sanitizer is a collaborator of the command handlers: a rejection is
//! shown to the user verbatim, so error messages are written for players.

use thiserror::Error;

/// Errors produced when tag text is rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SanitizeError {
    /// The tag is longer than the configured maximum.
    #[error("Tags cannot be longer than {max} characters.")]
    TooLong {
        /// The maximum length in characters.
        max: usize,
    },

    /// Nothing is left after normalization.
    #[error("Tags cannot be blank.")]
    Blank,
}

/// Normalizes and validates free-text input.
pub trait Sanitizer: Send + Sync {
    /// Return the normalized form of `text`.
    ///
    /// # Errors
    ///
    /// Returns a `SanitizeError` whose message is suitable for the user.
    fn sanitize(&self, text: &str) -> Result<String, SanitizeError>;
}

/// The default tag sanitizer.
///
/// Tags are compared by their normalized form, so "Finesse" and " finesse "
/// are the same tag.
#[derive(Debug, Clone)]
pub struct TagSanitizer {
    max_length: usize,
}

impl TagSanitizer {
    /// Default maximum tag length in characters.
    pub const DEFAULT_MAX_LENGTH: usize = 100;

    /// Create a sanitizer accepting tags of up to `max_length` characters.
    #[must_use]
    pub const fn new(max_length: usize) -> Self {
        Self { max_length }
    }
}

impl Default for TagSanitizer {
    fn default() -> Self {
        Self::new(Self::DEFAULT_MAX_LENGTH)
    }
}

impl Sanitizer for TagSanitizer {
    fn sanitize(&self, text: &str) -> Result<String, SanitizeError> {
        let mut normalized = String::with_capacity(text.len());
        let mut pending_space = false;

        for c in text.chars() {
            if c.is_whitespace() {
                pending_space = true;
            } else if !c.is_control() {
                if pending_space && !normalized.is_empty() {
                    normalized.push(' ');
                }
                pending_space = false;
                normalized.extend(c.to_lowercase());
            }
        }

        if normalized.is_empty() {
            return Err(SanitizeError::Blank);
        }
        if normalized.chars().count() > self.max_length {
            return Err(SanitizeError::TooLong {
                max: self.max_length,
            });
        }

        Ok(normalized)
    }
}
