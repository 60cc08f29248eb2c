// Sat Oct 17 2026 - Alex

use std::path::PathBuf;
use thiserror::Error;

/// Problems with the script itself. Layout errors of well-formed
/// declarations are reported per type in the `ScriptReport` instead.
#[derive(Error, Debug)]
pub enum ScriptError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Parse error: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("{owner}: unknown type '{type_name}'")]
    UnknownType { owner: String, type_name: String },
    #[error("{owner}: type '{type_name}' is used before its layout is complete")]
    IncompleteType { owner: String, type_name: String },
    #[error("{owner}: base '{base}' is not a struct, class or union")]
    NotARecord { owner: String, base: String },
    #[error("'{0}' is declared more than once")]
    Redeclared(String),
    #[error("{owner}: {what} {value} is not a power of two")]
    InvalidAlignment { owner: String, what: &'static str, value: usize },
    #[error("{owner}: bitfield '{member}' must have integral type, not '{type_name}'")]
    InvalidBitfield { owner: String, member: String, type_name: String },
}
