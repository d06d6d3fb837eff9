use serde::{Deserialize, Serialize};

/// Visitor metadata captured by the widget, one row per session.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, sqlx::FromRow)]
pub struct ClientDetail {
    pub session_id: String,
    pub ip_address: Option<String>,
    pub operating_system: Option<String>,
    pub referrer: Option<String>,
    pub accuracy: Option<f64>,
    pub longitude: Option<f64>,
    pub latitude: Option<f64>,
    pub name: Option<String>,
    pub email_address: Option<String>,
    pub contact_number: Option<String>,
}

impl ClientDetail {
    pub fn new(
        session_id: impl Into<String>,
        ip_address: Option<String>,
        operating_system: Option<String>,
        referrer: Option<String>,
    ) -> Self {
        Self {
            session_id: session_id.into(),
            ip_address,
            operating_system,
            referrer,
            ..Default::default()
        }
    }

    /// Record geolocation unless a longitude is already stored.
    /// Returns whether anything was written.
    pub fn set_location(
        &mut self,
        accuracy: Option<f64>,
        longitude: Option<f64>,
        latitude: Option<f64>,
    ) -> bool {
        if self.longitude.is_some() {
            return false;
        }
        self.accuracy = accuracy;
        self.longitude = longitude;
        self.latitude = latitude;
        true
    }

    pub fn set_contact(
        &mut self,
        name: Option<String>,
        email_address: Option<String>,
        contact_number: Option<String>,
    ) {
        self.name = name;
        self.email_address = email_address;
        self.contact_number = contact_number;
    }
}
