use supportline_core::models::ClientDetail;
use supportline_core::SupportError;

use crate::context::AppContext;

pub async fn load_client(ctx: &AppContext, session_id: &str) -> Result<ClientDetail, SupportError> {
    ctx.store
        .get_client(session_id)
        .await?
        .ok_or_else(|| SupportError::ClientNotFound(session_id.to_string()))
}

/// Store the visitor's geolocation. The first longitude recorded wins;
/// returns whether this call wrote anything.
pub async fn add_location(
    ctx: &AppContext,
    session_id: &str,
    accuracy: Option<f64>,
    longitude: Option<f64>,
    latitude: Option<f64>,
) -> Result<bool, SupportError> {
    let mut client = load_client(ctx, session_id).await?;
    if !client.set_location(accuracy, longitude, latitude) {
        tracing::debug!("Location for {} already recorded, ignoring", session_id);
        return Ok(false);
    }
    ctx.store.save_client(&client).await?;
    Ok(true)
}

/// Overwrite contact details and copy the name onto the session.
pub async fn add_contact(
    ctx: &AppContext,
    session_id: &str,
    name: Option<String>,
    email: Option<String>,
    phone: Option<String>,
) -> Result<(), SupportError> {
    let mut client = load_client(ctx, session_id).await?;
    client.set_contact(name.clone(), email, phone);
    ctx.store.save_client(&client).await?;

    if !ctx.store.set_visitor_name(session_id, name.as_deref()).await? {
        tracing::warn!("Contact saved for {} but no session row exists", session_id);
    }
    Ok(())
}
