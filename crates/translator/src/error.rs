//! Error types for translation.
//!
//! Every variant is a programmer error of one kind or another: either the
//! input violates a pipeline precondition or the fixed polyfill is broken.
//! Nothing here is recoverable; callers are expected to surface the message
//! and stop.

use sasm_analyses::Diagnostics;
use sasm_parser::ParseError;

#[derive(Debug, thiserror::Error)]
pub enum TranslationError {
    /// An EVM builtin was reachable from the input but the polyfill defines
    /// no function for it.
    #[error("no polyfill implementation for builtin `{0}`")]
    MissingPolyfill(String),

    /// The fixed polyfill text failed to parse; a build-time bug.
    #[error("polyfill failed to parse: {0}")]
    PolyfillParse(#[from] ParseError),

    /// The translated output failed analysis under the target dialect; a
    /// bug in the transform.
    #[error("translated output failed analysis:\n{0}")]
    Analysis(#[from] Diagnostics),
}

pub type Result<T> = std::result::Result<T, TranslationError>;
