//! Reply envelope carried back over the broker

use serde::{Deserialize, Serialize};

/// Either `data` or `errors`, never both.
///
/// `data` is always present on the wire (as `null` on failure) and `errors`
/// is omitted on success.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reply<T> {
    pub data: Option<T>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<String>>,
}

impl<T> Reply<T> {
    pub fn ok(data: T) -> Self {
        Self {
            data: Some(data),
            errors: None,
        }
    }

    pub fn errors(errors: Vec<String>) -> Self {
        Self {
            data: None,
            errors: Some(errors),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::errors(vec![message.into()])
    }

    pub fn is_ok(&self) -> bool {
        self.errors.is_none() && self.data.is_some()
    }

    /// Collapse into a `Result`. A reply with neither field set is an error
    /// with an empty message list.
    pub fn into_result(self) -> Result<T, Vec<String>> {
        match (self.data, self.errors) {
            (_, Some(errors)) => Err(errors),
            (Some(data), None) => Ok(data),
            (None, None) => Err(Vec::new()),
        }
    }
}
