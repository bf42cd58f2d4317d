use thiserror::Error;

pub type Result<T> = std::result::Result<T, ReactivityError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReactivityError {
    /// A write reached a readonly view. The underlying container is unchanged.
    #[error("set of key `{key}` failed: target is readonly")]
    ReadonlyWrite { key: String },

    #[error("reactive target must be an object or array, got {kind}")]
    NotAContainer { kind: &'static str },

    #[error("invalid array key: {key}")]
    InvalidArrayKey { key: String },
}

impl ReactivityError {
    #[must_use]
    pub fn readonly(key: impl ToString) -> Self {
        Self::ReadonlyWrite {
            key: key.to_string(),
        }
    }
}
