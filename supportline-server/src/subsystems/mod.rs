pub mod agents;
pub mod clients;
pub mod sessions;
pub mod tags;
pub mod widget;
