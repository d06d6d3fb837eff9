use supportline_core::models::WidgetSettings;
use supportline_core::SupportError;

use crate::context::AppContext;

pub async fn widget_config(ctx: &AppContext) -> Result<WidgetSettings, SupportError> {
    ctx.store.widget_settings().await
}

/// Replace the widget settings, dropping blank allow-list entries.
pub async fn update_widget_settings(
    ctx: &AppContext,
    mut settings: WidgetSettings,
) -> Result<WidgetSettings, SupportError> {
    settings.allowed_origins = clean_list(settings.allowed_origins);
    settings.restricted_paths = clean_list(settings.restricted_paths);
    ctx.store.save_widget_settings(&settings).await?;
    tracing::info!(
        "Widget settings updated: {} allowed origins, {} restricted paths",
        settings.allowed_origins.len(),
        settings.restricted_paths.len()
    );
    Ok(settings)
}

fn clean_list(items: Vec<String>) -> Vec<String> {
    items
        .into_iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}
