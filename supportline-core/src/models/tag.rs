use serde::{Deserialize, Serialize};

use crate::error::SupportError;

/// Catalog entry agents pick session tags from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Tag {
    pub name: String,
    pub description: Option<String>,
}

impl Tag {
    /// Validated tag. Names are trimmed, required, and may not contain a
    /// comma since the widget joins tag lists with one.
    pub fn new(name: &str, description: Option<String>) -> Result<Self, SupportError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(SupportError::InvalidRequest("tag name is required".into()));
        }
        if name.contains(',') {
            return Err(SupportError::InvalidRequest(format!(
                "tag name must not contain a comma: '{}'",
                name
            )));
        }

        Ok(Self {
            name: name.to_string(),
            description: description
                .map(|d| d.trim().to_string())
                .filter(|d| !d.is_empty()),
        })
    }
}
