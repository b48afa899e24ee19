use itertools::Itertools;
use std::result;
use thiserror::Error;

/// Failures surfaced by path access.
///
/// Every variant aborts the whole expression; nothing performed on earlier
/// segments is rolled back.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AccessError {
    #[error("unable to resolve {}", describe_member(.name, .owner, .args))]
    Unresolvable {
        name: String,
        owner: String,
        /// Runtime argument types when a call was attempted.
        args: Option<Vec<String>>,
    },
    #[error("unterminated '{delimiter}' opened at offset {offset}")]
    UnterminatedDelimiter { delimiter: char, offset: usize },
    #[error("index {index} out of range for size {size}")]
    IndexOutOfRange { index: i64, size: usize },
    #[error("cannot convert {from} to {to}")]
    Conversion { from: String, to: String },
    #[error("null target while accessing '{segment}'")]
    NullDereference { segment: String },
    #[error("syntax error at offset {offset}: {message}")]
    Syntax { offset: usize, message: String },
    #[error("'{name}' on {owner} is not writable")]
    NotWritable { name: String, owner: String },
    #[error("'{name}' on {owner} is not accessible")]
    Inaccessible { name: String, owner: String },
    #[error("invocation of '{name}' failed: {message}")]
    Invocation { name: String, message: String },
    #[error("{0}")]
    Generic(String),
}

pub type Result<T> = result::Result<T, AccessError>;

fn describe_member(name: &str, owner: &str, args: &Option<Vec<String>>) -> String {
    match args {
        Some(args) => format!("method {}({}) on {}", name, args.iter().join(", "), owner),
        None => format!("property '{}' on {}", name, owner),
    }
}

impl AccessError {
    pub fn unresolvable(name: impl Into<String>, owner: impl Into<String>) -> Self {
        AccessError::Unresolvable {
            name: name.into(),
            owner: owner.into(),
            args: None,
        }
    }

    pub fn unresolvable_call(
        name: impl Into<String>,
        owner: impl Into<String>,
        args: Vec<String>,
    ) -> Self {
        AccessError::Unresolvable {
            name: name.into(),
            owner: owner.into(),
            args: Some(args),
        }
    }

    pub fn conversion(from: impl Into<String>, to: impl Into<String>) -> Self {
        AccessError::Conversion {
            from: from.into(),
            to: to.into(),
        }
    }

    pub fn syntax(offset: usize, message: impl Into<String>) -> Self {
        AccessError::Syntax {
            offset,
            message: message.into(),
        }
    }

    pub fn not_writable(name: impl Into<String>, owner: impl Into<String>) -> Self {
        AccessError::NotWritable {
            name: name.into(),
            owner: owner.into(),
        }
    }

    pub fn null_target(segment: impl Into<String>) -> Self {
        AccessError::NullDereference {
            segment: segment.into(),
        }
    }

    /// Shifts offsets of a failure raised while scanning a sub-slice of a path.
    pub fn at_offset(self, base: usize) -> Self {
        match self {
            AccessError::Syntax { offset, message } => AccessError::Syntax {
                offset: offset + base,
                message,
            },
            AccessError::UnterminatedDelimiter { delimiter, offset } => {
                AccessError::UnterminatedDelimiter {
                    delimiter,
                    offset: offset + base,
                }
            }
            other => other,
        }
    }
}

// Convert from eyre::Report so host methods can use eyre freely
impl From<eyre::Report> for AccessError {
    fn from(err: eyre::Report) -> Self {
        AccessError::Generic(err.to_string())
    }
}

impl From<String> for AccessError {
    fn from(s: String) -> Self {
        AccessError::Generic(s)
    }
}

impl From<toml::de::Error> for AccessError {
    fn from(e: toml::de::Error) -> Self {
        AccessError::Generic(e.to_string())
    }
}
