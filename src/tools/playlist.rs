//! Playlist tools: listing, contents, create/add/remove/delete.
//!
//! Playlists preserve submitted order: create and add resolve titles
//! strictly in input order and the server keeps item order.

use rmcp::{model::CallToolResult, ErrorData as McpError};
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::json;

use crate::plex::types::MediaItem;
use crate::plex::{PlexClient, PlexHandle};
use crate::shared::{self, format_duration_ms};
use crate::shared::resolve::{fold_batch, resolve_title, BatchOutcome, BatchResolution, Resolution};

use super::{connect, item_summary, search_scope, ToolStep};

// === Parameter Types ===

#[derive(Debug, Deserialize, JsonSchema)]
pub struct ListParams {
    #[schemars(description = "Only playlists containing items from this library")]
    pub library_name: Option<String>,
    #[schemars(description = "Playlist content type: audio, video or photo")]
    pub content_type: Option<String>,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct TitleParams {
    #[schemars(description = "Playlist title (case-insensitive)")]
    pub playlist_title: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct CreateParams {
    #[schemars(description = "Title for the new playlist")]
    pub playlist_title: String,
    #[schemars(description = "Media titles to include, in playback order")]
    pub item_titles: Vec<String>,
    #[schemars(description = "Limit item lookups to one library")]
    pub library_name: Option<String>,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct ModifyParams {
    #[schemars(description = "Playlist title (case-insensitive)")]
    pub playlist_title: String,
    #[schemars(description = "Media titles to add/remove")]
    pub item_titles: Vec<String>,
    #[schemars(description = "Limit item lookups to one library")]
    pub library_name: Option<String>,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct RemoveParams {
    #[schemars(description = "Playlist title (case-insensitive)")]
    pub playlist_title: String,
    #[schemars(description = "Media titles to remove")]
    pub item_titles: Vec<String>,
}

// === Helper Functions ===

/// Collapse the aliases users reach for onto the three playlist types.
fn normalize_content_type(content_type: &str) -> String {
    match content_type.to_lowercase().as_str() {
        "audio" | "music" => "audio".to_string(),
        "video" | "movie" | "show" => "video".to_string(),
        "photo" | "image" => "photo".to_string(),
        other => other.to_string(),
    }
}

/// Playlist type implied by the first resolved item.
fn playlist_kind(items: &[MediaItem]) -> &'static str {
    match items.first().map(|i| i.kind.as_str()) {
        Some("track") | Some("album") | Some("artist") => "audio",
        Some("photo") => "photo",
        _ => "video",
    }
}

async fn find_playlist(client: &PlexClient, title: &str) -> ToolStep<MediaItem> {
    let playlists = match client.playlists(None).await {
        Ok(playlists) => playlists,
        Err(e) => return Err(shared::failure(format!("Error listing playlists: {e}"))),
    };
    let wanted = title.to_lowercase();
    let candidates: Vec<MediaItem> = playlists
        .into_iter()
        .filter(|p| p.title.to_lowercase().contains(&wanted))
        .collect();
    match resolve_title(title, candidates) {
        Resolution::One(playlist) => Ok(*playlist),
        Resolution::NotFound => Err(shared::failure(format!("Playlist '{title}' not found"))),
        Resolution::Ambiguous(matches) => Err(shared::disambiguation(
            format!("Multiple playlists matched '{title}'"),
            &matches,
        )),
    }
}

/// Resolve a title list in input order, aborting on the first ambiguity.
async fn resolve_item_titles(
    client: &PlexClient,
    titles: &[String],
    library: Option<&str>,
) -> ToolStep<BatchResolution> {
    let mut resolutions = Vec::with_capacity(titles.len());
    for title in titles {
        let candidates = search_scope(client, title, library).await?;
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

fn playlist_summary(playlist: &MediaItem) -> serde_json::Value {
    json!({
        "title": playlist.title,
        "id": playlist.rating_key,
        "type": playlist.playlist_type,
        "smart": playlist.smart.unwrap_or(false),
        "item_count": playlist.leaf_count,
        "duration": playlist.duration.map(format_duration_ms),
    })
}

// === Tool Functions ===

pub async fn list(plex: &PlexHandle, params: ListParams) -> Result<CallToolResult, McpError> {
    let client = match connect(plex).await {
        Ok(c) => c,
        Err(resp) => return resp,
    };
    let content_type = params.content_type.as_deref().map(normalize_content_type);
    let playlists = match client.playlists(content_type.as_deref()).await {
        Ok(playlists) => playlists,
        Err(e) => return shared::failure(format!("Error listing playlists: {e}")),
    };

    let playlists = match &params.library_name {
        Some(name) => {
            let section = match client.section_by_title(name).await {
                Ok(Some(section)) => section,
                Ok(None) => return shared::failure(format!("Library '{name}' not found")),
                Err(e) => return shared::failure(format!("Error listing libraries: {e}")),
            };
            // No per-library playlist endpoint; keep playlists that hold at
            // least one item from the section.
            let mut kept = Vec::new();
            for playlist in playlists {
                match client.playlist_items(&playlist.rating_key).await {
                    Ok(items) => {
                        let hit = items.iter().any(|i| {
                            i.library_section_title.as_deref() == Some(section.title.as_str())
                        });
                        if hit {
                            kept.push(playlist);
                        }
                    }
                    Err(e) => {
                        tracing::warn!("Skipping playlist '{}': {e}", playlist.title);
                    }
                }
            }
            kept
        }
        None => playlists,
    };

    if playlists.is_empty() {
        return shared::failure("No playlists found");
    }
    let listed: Vec<serde_json::Value> = playlists.iter().map(playlist_summary).collect();
    shared::success(json!({"count": listed.len(), "playlists": listed}))
}

pub async fn get_contents(
    plex: &PlexHandle,
    params: TitleParams,
) -> Result<CallToolResult, McpError> {
    let client = match connect(plex).await {
        Ok(c) => c,
        Err(resp) => return resp,
    };
    let playlist = match find_playlist(client, &params.playlist_title).await {
        Ok(playlist) => playlist,
        Err(resp) => return resp,
    };
    let items = match client.playlist_items(&playlist.rating_key).await {
        Ok(items) => items,
        Err(e) => return shared::failure(format!("Error fetching playlist items: {e}")),
    };
    let listed: Vec<serde_json::Value> = items.iter().map(item_summary).collect();
    shared::success(json!({
        "playlist": playlist.title,
        "id": playlist.rating_key,
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

    let existing = match client.playlists(None).await {
        Ok(playlists) => playlists,
        Err(e) => return shared::failure(format!("Error listing playlists: {e}")),
    };
    if existing
        .iter()
        .any(|p| p.title.eq_ignore_ascii_case(&params.playlist_title))
    {
        return shared::failure(format!(
            "A playlist titled '{}' already exists. Choose a different title or use playlist_add_items.",
            params.playlist_title
        ));
    }

    let batch = match resolve_item_titles(
        client,
        &params.item_titles,
        params.library_name.as_deref(),
    )
    .await
    {
        Ok(batch) => batch,
        Err(resp) => return resp,
    };
    if batch.items.is_empty() {
        return shared::failure("No valid media items found for the playlist");
    }

    let keys: Vec<String> = batch.items.iter().map(|i| i.rating_key.clone()).collect();
    let kind = playlist_kind(&batch.items);
    let created = match client.create_playlist(&params.playlist_title, kind, &keys).await {
        Ok(created) => created,
        Err(e) => return shared::failure(format!("Error creating playlist: {e}")),
    };

    let listed: Vec<serde_json::Value> = batch.items.iter().map(item_summary).collect();
    shared::success(json!({
        "created": params.playlist_title,
        "id": created.map(|p| p.rating_key),
        "type": kind,
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
    let playlist = match find_playlist(client, &params.playlist_title).await {
        Ok(playlist) => playlist,
        Err(resp) => return resp,
    };
    let batch = match resolve_item_titles(
        client,
        &params.item_titles,
        params.library_name.as_deref(),
    )
    .await
    {
        Ok(batch) => batch,
        Err(resp) => return resp,
    };
    if batch.items.is_empty() {
        return shared::failure("No valid media items found to add to the playlist");
    }

    let keys: Vec<String> = batch.items.iter().map(|i| i.rating_key.clone()).collect();
    if let Err(e) = client.playlist_add_items(&playlist.rating_key, &keys).await {
        return shared::failure(format!("Error adding to playlist: {e}"));
    }
    shared::success(json!({
        "playlist": playlist.title,
        "added": keys.len(),
        "not_found": batch.not_found,
    }))
}

pub async fn remove_items(
    plex: &PlexHandle,
    params: RemoveParams,
) -> Result<CallToolResult, McpError> {
    if params.item_titles.is_empty() {
        return shared::failure("item_titles must not be empty");
    }
    let client = match connect(plex).await {
        Ok(c) => c,
        Err(resp) => return resp,
    };
    let playlist = match find_playlist(client, &params.playlist_title).await {
        Ok(playlist) => playlist,
        Err(resp) => return resp,
    };
    let items = match client.playlist_items(&playlist.rating_key).await {
        Ok(items) => items,
        Err(e) => return shared::failure(format!("Error fetching playlist items: {e}")),
    };

    let mut removed = Vec::new();
    let mut not_found = Vec::new();
    for title in &params.item_titles {
        let wanted = title.to_lowercase();
        let hit = items
            .iter()
            .find(|i| i.title.to_lowercase() == wanted)
            .or_else(|| items.iter().find(|i| i.title.to_lowercase().contains(&wanted)));
        match hit.and_then(|i| i.playlist_item_id.map(|id| (i, id))) {
            Some((item, playlist_item_id)) => {
                if let Err(e) = client
                    .playlist_remove_item(&playlist.rating_key, playlist_item_id)
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
            "No matching items found in playlist '{}'",
            playlist.title
        ));
    }
    shared::success(json!({
        "playlist": playlist.title,
        "removed": removed,
        "not_found": not_found,
    }))
}

pub async fn delete(plex: &PlexHandle, params: TitleParams) -> Result<CallToolResult, McpError> {
    let client = match connect(plex).await {
        Ok(c) => c,
        Err(resp) => return resp,
    };
    let playlist = match find_playlist(client, &params.playlist_title).await {
        Ok(playlist) => playlist,
        Err(resp) => return resp,
    };
    if let Err(e) = client.delete_playlist(&playlist.rating_key).await {
        return shared::failure(format!("Error deleting playlist: {e}"));
    }
    shared::success(json!({
        "deleted": playlist.title,
        "id": playlist.rating_key,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_content_type_aliases() {
        assert_eq!(normalize_content_type("Music"), "audio");
        assert_eq!(normalize_content_type("movie"), "video");
        assert_eq!(normalize_content_type("image"), "photo");
        assert_eq!(normalize_content_type("audio"), "audio");
    }

    #[test]
    fn test_playlist_kind_follows_first_item() {
        let track = MediaItem {
            kind: "track".into(),
            ..Default::default()
        };
        let movie = MediaItem {
            kind: "movie".into(),
            ..Default::default()
        };
        assert_eq!(playlist_kind(&[track]), "audio");
        assert_eq!(playlist_kind(&[movie]), "video");
        assert_eq!(playlist_kind(&[]), "video");
    }
}
