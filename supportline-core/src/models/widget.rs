use serde::{Deserialize, Serialize};

/// Process-wide widget configuration. Serialises as the `utils` projection.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, sqlx::FromRow)]
pub struct WidgetSettings {
    pub welcome_message: String,
    pub returning_message: String,
    #[sqlx(json)]
    pub allowed_origins: Vec<String>,
    #[sqlx(json)]
    pub restricted_paths: Vec<String>,
}
