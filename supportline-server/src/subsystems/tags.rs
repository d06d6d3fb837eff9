use supportline_core::models::Tag;
use supportline_core::SupportError;

use crate::context::AppContext;

pub async fn list_tags(ctx: &AppContext) -> Result<Vec<Tag>, SupportError> {
    ctx.store.list_tags().await
}

/// Add a tag to the catalog. Names must be unique.
pub async fn create_tag(
    ctx: &AppContext,
    name: &str,
    description: Option<String>,
) -> Result<Tag, SupportError> {
    let tag = Tag::new(name, description)?;
    if !ctx.store.create_tag(&tag).await? {
        return Err(SupportError::InvalidRequest(format!(
            "tag '{}' already exists",
            tag.name
        )));
    }

    tracing::info!("Created tag '{}'", tag.name);
    Ok(tag)
}

/// Remove a tag from the catalog. Sessions already carrying it keep it.
pub async fn delete_tag(ctx: &AppContext, name: &str) -> Result<(), SupportError> {
    if !ctx.store.delete_tag(name).await? {
        return Err(SupportError::TagNotFound(name.to_string()));
    }
    tracing::info!("Deleted tag '{}'", name);
    Ok(())
}
