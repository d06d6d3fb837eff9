pub mod agent;
pub mod client;
pub mod session;
pub mod tag;
pub mod widget;

pub use agent::{
    AgentProfile, AgentProfileUpdate, CannedMessage, CannedScope, UserAccount, RESERVED_USERS,
};
pub use client::ClientDetail;
pub use session::{
    new_session_id, AssignmentRecord, Message, MessageView, Session, SessionFilter,
    SessionSummary, DEFAULT_MESSAGE_TYPE, GUEST,
};
pub use tag::Tag;
pub use widget::WidgetSettings;
