//! Error type for heap operations.

use std::error::Error;
use std::fmt;

/// Error returned by fallible heap operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeapError {
    /// `decrease_key` was called with a key greater than the current key.
    ///
    /// The structure is left untouched; a decrease must never increase a key.
    KeyNotDecreased,
}

impl fmt::Display for HeapError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HeapError::KeyNotDecreased => {
                write!(f, "new key is greater than the current key")
            }
        }
    }
}

impl Error for HeapError {}
