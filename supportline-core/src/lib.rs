pub mod assignment;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod protocol;
pub mod store;

pub use assignment::{resolve_assignment, Assignment, AssignmentPolicy, ResolveOutcome};
pub use config::SupportlineConfig;
pub use error::SupportError;
pub use protocol::{WidgetRequest, WidgetResponse};
pub use store::{ChatStore, InMemoryStore, PgStore};
