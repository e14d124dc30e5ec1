//! Collection tools: listing, contents, create/add/remove/delete/edit.
//!
//! Collections are section-scoped on the server and keep their own sort
//! order; contents come back in server-assigned order.

use rmcp::{model::CallToolResult, ErrorData as McpError};
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::json;

use crate::plex::types::{MediaItem, Section};
use crate::plex::{type_code, PlexClient, PlexHandle};
use crate::shared;
use crate::shared::resolve::{fold_batch, resolve_title, BatchOutcome, BatchResolution, Resolution};

use super::{connect, item_summary, search_scope, ToolStep};

// === Parameter Types ===

#[derive(Debug, Deserialize, JsonSchema)]
pub struct ListParams {
    #[schemars(description = "Only collections from this library")]
    pub library_name: Option<String>,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct RefParams {
    #[schemars(description = "Collection title (case-insensitive)")]
    pub collection_title: String,
    #[schemars(description = "Library the collection lives in (searched everywhere when omitted)")]
    pub library_name: Option<String>,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct CreateParams {
    #[schemars(description = "Title for the new collection")]
    pub collection_title: String,
    #[schemars(description = "Library to create the collection in")]
    pub library_name: String,
    #[schemars(description = "Media titles to include")]
    pub item_titles: Vec<String>,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct ModifyParams {
    #[schemars(description = "Collection title (case-insensitive)")]
    pub collection_title: String,
    #[schemars(description = "Library the collection lives in")]
    pub library_name: String,
    #[schemars(description = "Media titles to add/remove")]
    pub item_titles: Vec<String>,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct DeleteParams {
    #[schemars(description = "Collection title (case-insensitive)")]
    pub collection_title: String,
    #[schemars(description = "Library the collection lives in")]
    pub library_name: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct EditParams {
    #[schemars(description = "Collection title (case-insensitive)")]
    pub collection_title: String,
    #[schemars(description = "Library the collection lives in")]
    pub library_name: String,
    #[schemars(description = "New title")]
    pub new_title: Option<String>,
    #[schemars(description = "New sort title")]
    pub new_sort_title: Option<String>,
    #[schemars(description = "New summary")]
    pub new_summary: Option<String>,
    #[schemars(description = "New content rating (e.g. PG-13)")]
    pub new_content_rating: Option<String>,
    #[schemars(description = "Labels to add")]
    pub add_labels: Option<Vec<String>>,
    #[schemars(description = "Labels to remove")]
    pub remove_labels: Option<Vec<String>>,
}

// === Helper Functions ===

async fn find_section(client: &PlexClient, name: &str) -> ToolStep<Section> {
    match client.section_by_title(name).await {
        Ok(Some(section)) => Ok(section),
        Ok(None) => Err(shared::failure(format!("Library '{name}' not found"))),
        Err(e) => Err(shared::failure(format!("Error listing libraries: {e}"))),
    }
}

/// Collections for one section, or for every section when none is named.
async fn gather_collections(
    client: &PlexClient,
    library: Option<&str>,
) -> ToolStep<Vec<MediaItem>> {
    match library {
        Some(name) => {
            let section = find_section(client, name).await?;
            client
                .collections(&section.key)
                .await
                .map_err(|e| shared::failure(format!("Error listing collections: {e}")))
        }
        None => {
            let sections = match client.sections().await {
                Ok(sections) => sections,
                Err(e) => return Err(shared::failure(format!("Error listing libraries: {e}"))),
            };
            let mut all = Vec::new();
            for section in &sections {
                match client.collections(&section.key).await {
                    Ok(mut collections) => all.append(&mut collections),
                    Err(e) => {
                        tracing::warn!("Skipping collections of '{}': {e}", section.title);
                    }
                }
            }
            Ok(all)
        }
    }
}

async fn find_collection(
    client: &PlexClient,
    title: &str,
    library: Option<&str>,
) -> ToolStep<MediaItem> {
    let collections = gather_collections(client, library).await?;
    let wanted = title.to_lowercase();
    let candidates: Vec<MediaItem> = collections
        .into_iter()
        .filter(|c| c.title.to_lowercase().contains(&wanted))
        .collect();
    match resolve_title(title, candidates) {
        Resolution::One(collection) => Ok(*collection),
        Resolution::NotFound => Err(shared::failure(format!(
            "Collection '{title}' not found"
        ))),
        Resolution::Ambiguous(matches) => Err(shared::disambiguation(
            format!("Multiple collections matched '{title}'"),
            &matches,
        )),
    }
}

async fn resolve_item_titles(
    client: &PlexClient,
    titles: &[String],
    library: &str,
) -> ToolStep<BatchResolution> {
    let mut resolutions = Vec::with_capacity(titles.len());
    for title in titles {
        let candidates = search_scope(client, title, Some(library)).await?;
        resolutions.push(resolve_title(title, candidates));
    }
    match fold_batch(titles, resolutions) {
        BatchOutcome::Resolved(batch) => Ok(batch),
        BatchOutcome::Ambiguous { title, matches } => Err(shared::disambiguation(
            format!("Multiple items matched '{title}'. Narrow the search or drop it from the list."),
            &matches,
        )),
    }
}

/// Section-edit query for a collection; collections are type 18 on the
/// wire.
fn build_edit_params(rating_key: &str, params: &EditParams) -> Vec<(String, String)> {
    let mut fields = vec![
        ("type".to_string(), "18".to_string()),
        ("id".to_string(), rating_key.to_string()),
    ];
    if let Some(title) = &params.new_title {
        fields.push(("title.value".to_string(), title.clone()));
    }
    if let Some(sort) = &params.new_sort_title {
        fields.push(("titleSort.value".to_string(), sort.clone()));
    }
    if let Some(summary) = &params.new_summary {
        fields.push(("summary.value".to_string(), summary.clone()));
    }
    if let Some(rating) = &params.new_content_rating {
        fields.push(("contentRating.value".to_string(), rating.clone()));
    }
    let mut label_index = 0;
    if let Some(labels) = &params.add_labels {
        for label in labels {
            fields.push((format!("label[{label_index}].tag.tag"), label.clone()));
            label_index += 1;
        }
    }
    if let Some(labels) = &params.remove_labels {
        for label in labels {
            fields.push(("label[].tag.tag-".to_string(), label.clone()));
        }
    }
    fields
}

fn collection_summary(collection: &MediaItem) -> serde_json::Value {
    json!({
        "title": collection.title,
        "id": collection.rating_key,
        "item_count": collection.child_count,
        "library": collection.library_section_title,
    })
}

// === Tool Functions ===

pub async fn list(plex: &PlexHandle, params: ListParams) -> Result<CallToolResult, McpError> {
    let client = match connect(plex).await {
        Ok(c) => c,
        Err(resp) => return resp,
    };
    let collections = match gather_collections(client, params.library_name.as_deref()).await {
        Ok(collections) => collections,
        Err(resp) => return resp,
    };
    if collections.is_empty() {
        return shared::failure("No collections found");
    }
    let listed: Vec<serde_json::Value> = collections.iter().map(collection_summary).collect();
    shared::success(json!({"count": listed.len(), "collections": listed}))
}

pub async fn get_contents(plex: &PlexHandle, params: RefParams) -> Result<CallToolResult, McpError> {
    let client = match connect(plex).await {
        Ok(c) => c,
        Err(resp) => return resp,
    };
    let collection = match find_collection(
        client,
        &params.collection_title,
        params.library_name.as_deref(),
    )
    .await
    {
        Ok(collection) => collection,
        Err(resp) => return resp,
    };
    let items = match client.collection_children(&collection.rating_key).await {
        Ok(items) => items,
        Err(e) => return shared::failure(format!("Error fetching collection items: {e}")),
    };
    let listed: Vec<serde_json::Value> = items.iter().map(item_summary).collect();
    shared::success(json!({
        "collection": collection.title,
        "id": collection.rating_key,
        "item_count": listed.len(),
        "items": listed,
    }))
}

pub async fn create(plex: &PlexHandle, params: CreateParams) -> Result<CallToolResult, McpError> {
    if params.item_titles.is_empty() {
        return shared::failure("item_titles must not be empty");
    }
    let client = match connect(plex).await {
        Ok(c) => c,
        Err(resp) => return resp,
    };
    let section = match find_section(client, &params.library_name).await {
        Ok(section) => section,
        Err(resp) => return resp,
    };

    let existing = match client.collections(&section.key).await {
        Ok(collections) => collections,
        Err(e) => return shared::failure(format!("Error listing collections: {e}")),
    };
    if existing
        .iter()
        .any(|c| c.title.eq_ignore_ascii_case(&params.collection_title))
    {
        return shared::failure(format!(
            "A collection titled '{}' already exists in '{}'. Use collection_add_items to extend it.",
            params.collection_title, section.title
        ));
    }

    let batch = match resolve_item_titles(client, &params.item_titles, &params.library_name).await {
        Ok(batch) => batch,
        Err(resp) => return resp,
    };
    if batch.items.is_empty() {
        return shared::failure("No valid media items found for the collection");
    }

    let keys: Vec<String> = batch.items.iter().map(|i| i.rating_key.clone()).collect();
    let code = batch
        .items
        .first()
        .and_then(|i| type_code(&i.kind))
        .unwrap_or(1);
    let created = match client
        .create_collection(&params.collection_title, code, &section.key, &keys)
        .await
    {
        Ok(created) => created,
        Err(e) => return shared::failure(format!("Error creating collection: {e}")),
    };

    let listed: Vec<serde_json::Value> = batch.items.iter().map(item_summary).collect();
    shared::success(json!({
        "created": params.collection_title,
        "id": created.map(|c| c.rating_key),
        "library": section.title,
        "item_count": listed.len(),
        "items": listed,
        "not_found": batch.not_found,
    }))
}

pub async fn add_items(plex: &PlexHandle, params: ModifyParams) -> Result<CallToolResult, McpError> {
    if params.item_titles.is_empty() {
        return shared::failure("item_titles must not be empty");
    }
    let client = match connect(plex).await {
        Ok(c) => c,
        Err(resp) => return resp,
    };
    let collection = match find_collection(
        client,
        &params.collection_title,
        Some(params.library_name.as_str()),
    )
    .await
    {
        Ok(collection) => collection,
        Err(resp) => return resp,
    };
    let batch = match resolve_item_titles(client, &params.item_titles, &params.library_name).await {
        Ok(batch) => batch,
        Err(resp) => return resp,
    };
    if batch.items.is_empty() {
        return shared::failure("No valid media items found to add to the collection");
    }

    let keys: Vec<String> = batch.items.iter().map(|i| i.rating_key.clone()).collect();
    if let Err(e) = client.collection_add_items(&collection.rating_key, &keys).await {
        return shared::failure(format!("Error adding to collection: {e}"));
    }
    shared::success(json!({
        "collection": collection.title,
        "added": keys.len(),
        "not_found": batch.not_found,
    }))
}

pub async fn remove_items(
    plex: &PlexHandle,
    params: ModifyParams,
) -> Result<CallToolResult, McpError> {
    if params.item_titles.is_empty() {
        return shared::failure("item_titles must not be empty");
    }
    let client = match connect(plex).await {
        Ok(c) => c,
        Err(resp) => return resp,
    };
    let collection = match find_collection(
        client,
        &params.collection_title,
        Some(params.library_name.as_str()),
    )
    .await
    {
        Ok(collection) => collection,
        Err(resp) => return resp,
    };
    let items = match client.collection_children(&collection.rating_key).await {
        Ok(items) => items,
        Err(e) => return shared::failure(format!("Error fetching collection items: {e}")),
    };

    let mut removed = Vec::new();
    let mut not_found = Vec::new();
    for title in &params.item_titles {
        let wanted = title.to_lowercase();
        // Exact title first, substring as the fallback.
        let hit = items
            .iter()
            .find(|i| i.title.to_lowercase() == wanted)
            .or_else(|| items.iter().find(|i| i.title.to_lowercase().contains(&wanted)));
        match hit {
            Some(item) => {
                if let Err(e) = client
                    .collection_remove_item(&collection.rating_key, &item.rating_key)
                    .await
                {
                    return shared::failure(format!("Error removing '{}': {e}", item.title));
                }
                removed.push(item.title.clone());
            }
            None => not_found.push(title.clone()),
        }
    }

    if removed.is_empty() {
        return shared::failure(format!(
            "No matching items found in collection '{}'",
            collection.title
        ));
    }
    shared::success(json!({
        "collection": collection.title,
        "removed": removed,
        "not_found": not_found,
    }))
}

pub async fn delete(plex: &PlexHandle, params: DeleteParams) -> Result<CallToolResult, McpError> {
    let client = match connect(plex).await {
        Ok(c) => c,
        Err(resp) => return resp,
    };
    let collection = match find_collection(
        client,
        &params.collection_title,
        Some(params.library_name.as_str()),
    )
    .await
    {
        Ok(collection) => collection,
        Err(resp) => return resp,
    };
    if let Err(e) = client.delete_collection(&collection.rating_key).await {
        return shared::failure(format!("Error deleting collection: {e}"));
    }
    shared::success(json!({
        "deleted": collection.title,
        "id": collection.rating_key,
    }))
}

pub async fn edit(plex: &PlexHandle, params: EditParams) -> Result<CallToolResult, McpError> {
    let client = match connect(plex).await {
        Ok(c) => c,
        Err(resp) => return resp,
    };
    let section = match find_section(client, &params.library_name).await {
        Ok(section) => section,
        Err(resp) => return resp,
    };
    let collection = match find_collection(
        client,
        &params.collection_title,
        Some(params.library_name.as_str()),
    )
    .await
    {
        Ok(collection) => collection,
        Err(resp) => return resp,
    };

    let fields = build_edit_params(&collection.rating_key, &params);
    // type + id alone means nothing was requested.
    if fields.len() == 2 {
        return shared::failure("No collection changes requested");
    }
    if let Err(e) = client.edit_in_section(&section.key, &fields).await {
        return shared::failure(format!("Error editing collection: {e}"));
    }
    shared::success(json!({
        "collection": collection.title,
        "id": collection.rating_key,
        "updated": true,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn edit_params() -> EditParams {
        EditParams {
            collection_title: "Heist Films".into(),
            library_name: "Movies".into(),
            new_title: None,
            new_sort_title: None,
            new_summary: None,
            new_content_rating: None,
            add_labels: None,
            remove_labels: None,
        }
    }

    #[test]
    fn test_edit_params_always_address_the_collection() {
        let fields = build_edit_params("77", &edit_params());
        assert_eq!(fields[0], ("type".to_string(), "18".to_string()));
        assert_eq!(fields[1], ("id".to_string(), "77".to_string()));
        assert_eq!(fields.len(), 2);
    }

    #[test]
    fn test_edit_params_labels_and_fields() {
        let params = EditParams {
            new_title: Some("Heists".into()),
            add_labels: Some(vec!["noir".into(), "classic".into()]),
            remove_labels: Some(vec!["old".into()]),
            ..edit_params()
        };
        let fields = build_edit_params("77", &params);
        assert!(fields.contains(&("title.value".to_string(), "Heists".to_string())));
        assert!(fields.contains(&("label[0].tag.tag".to_string(), "noir".to_string())));
        assert!(fields.contains(&("label[1].tag.tag".to_string(), "classic".to_string())));
        assert!(fields.contains(&("label[].tag.tag-".to_string(), "old".to_string())));
    }
}
