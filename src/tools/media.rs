//! Media item tools: search, details, metadata editing, deletion, artwork.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use rmcp::{model::CallToolResult, ErrorData as McpError};
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::{json, Map, Value};

use crate::plex::types::MediaItem;
use crate::plex::{PlexClient, PlexHandle};
use crate::shared::{self, format_duration_ms};

use super::{connect, item_summary, locate_media};

// === Parameter Types ===

#[derive(Debug, Deserialize, JsonSchema)]
pub struct SearchParams {
    #[schemars(description = "Search term")]
    pub query: String,
    #[schemars(
        description = "Limit results to one content type (movie, show, season, episode, artist, album, track)"
    )]
    pub content_type: Option<String>,
    #[schemars(description = "Maximum number of results (default: 100)")]
    pub limit: Option<usize>,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct MediaRefParams {
    #[schemars(description = "Title of the media item (ignored when media_id is given)")]
    pub media_title: Option<String>,
    #[schemars(description = "Rating key of the media item; bypasses title lookup")]
    pub media_id: Option<i64>,
    #[schemars(description = "Limit the title lookup to one library")]
    pub library_name: Option<String>,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct EditMetadataParams {
    #[schemars(description = "Title of the media item (ignored when media_id is given)")]
    pub media_title: Option<String>,
    #[schemars(description = "Rating key of the media item; bypasses title lookup")]
    pub media_id: Option<i64>,
    #[schemars(description = "Limit the title lookup to one library")]
    pub library_name: Option<String>,
    #[schemars(description = "New title")]
    pub new_title: Option<String>,
    #[schemars(description = "New summary/description")]
    pub new_summary: Option<String>,
    #[schemars(description = "New user rating (0-10)")]
    pub new_rating: Option<f64>,
    #[schemars(description = "New release date (YYYY-MM-DD)")]
    pub new_release_date: Option<String>,
    #[schemars(description = "New studio")]
    pub new_studio: Option<String>,
    #[schemars(description = "Genre to add")]
    pub add_genre: Option<String>,
    #[schemars(description = "Genre to remove")]
    pub remove_genre: Option<String>,
    #[schemars(description = "Labels to add")]
    pub add_labels: Option<Vec<String>>,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct ArtworkListParams {
    #[schemars(description = "Title of the media item (ignored when media_id is given)")]
    pub media_title: Option<String>,
    #[schemars(description = "Rating key of the media item; bypasses title lookup")]
    pub media_id: Option<i64>,
    #[schemars(description = "Limit the title lookup to one library")]
    pub library_name: Option<String>,
    #[schemars(description = "Artwork type: poster, background/art or logo (default: poster)")]
    pub art_type: Option<String>,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct SetArtworkParams {
    #[schemars(description = "Title of the media item (ignored when media_id is given)")]
    pub media_title: Option<String>,
    #[schemars(description = "Rating key of the media item; bypasses title lookup")]
    pub media_id: Option<i64>,
    #[schemars(description = "Limit the title lookup to one library")]
    pub library_name: Option<String>,
    #[schemars(description = "Artwork type: poster, background/art or logo (default: poster)")]
    pub art_type: Option<String>,
    #[schemars(description = "URL of the image to set")]
    pub url: Option<String>,
    #[schemars(description = "Local path of the image to upload")]
    pub filepath: Option<String>,
    #[schemars(description = "Lock the artwork so the agent won't replace it")]
    pub lock: Option<bool>,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct GetArtworkParams {
    #[schemars(description = "Title of the media item (ignored when media_id is given)")]
    pub media_title: Option<String>,
    #[schemars(description = "Rating key of the media item; bypasses title lookup")]
    pub media_id: Option<i64>,
    #[schemars(description = "Limit the title lookup to one library")]
    pub library_name: Option<String>,
    #[schemars(description = "Artwork types to fetch (poster, background/art); default poster")]
    pub image_types: Option<Vec<String>>,
    #[schemars(description = "Return format: base64 or url (default: base64)")]
    pub output_format: Option<String>,
}

// === Helper Functions ===

/// Map the user-facing artwork names onto the metadata child endpoints.
fn art_endpoint(art_type: &str) -> Option<&'static str> {
    match art_type.to_lowercase().as_str() {
        "poster" | "thumb" | "thumbnail" => Some("posters"),
        "background" | "art" => Some("arts"),
        "logo" => Some("logos"),
        _ => None,
    }
}

/// Lock field for an artwork type; logos have no lockable field.
fn art_lock_field(endpoint: &str) -> Option<&'static str> {
    match endpoint {
        "posters" => Some("thumb.locked"),
        "arts" => Some("art.locked"),
        _ => None,
    }
}

const TYPE_ORDER: [&str; 7] = [
    "track", "album", "artist", "movie", "show", "season", "episode",
];

/// Group search hits by type, music first, then film and TV, then
/// whatever else turned up.
fn group_by_type(items: &[MediaItem]) -> Vec<(String, Vec<Value>)> {
    let mut groups: Vec<(String, Vec<Value>)> = Vec::new();
    for kind in TYPE_ORDER {
        let hits: Vec<Value> = items
            .iter()
            .filter(|i| i.kind == kind)
            .map(item_summary)
            .collect();
        if !hits.is_empty() {
            groups.push((kind.to_string(), hits));
        }
    }
    for item in items {
        if !TYPE_ORDER.contains(&item.kind.as_str())
            && !groups.iter().any(|(k, _)| *k == item.kind)
        {
            let hits: Vec<Value> = items
                .iter()
                .filter(|i| i.kind == item.kind)
                .map(item_summary)
                .collect();
            groups.push((item.kind.clone(), hits));
        }
    }
    groups
}

/// Field edits and a human change list for the metadata edit call. The
/// rating is applied through the rate endpoint and handled separately.
fn build_edit_params(params: &EditMetadataParams) -> (Vec<(String, String)>, Vec<String>) {
    let mut fields = Vec::new();
    let mut changes = Vec::new();
    if let Some(title) = &params.new_title {
        fields.push(("title.value".to_string(), title.clone()));
        fields.push(("title.locked".to_string(), "1".to_string()));
        changes.push(format!("title changed to '{title}'"));
    }
    if let Some(summary) = &params.new_summary {
        fields.push(("summary.value".to_string(), summary.clone()));
        fields.push(("summary.locked".to_string(), "1".to_string()));
        changes.push("summary updated".to_string());
    }
    if let Some(date) = &params.new_release_date {
        fields.push(("originallyAvailableAt.value".to_string(), date.clone()));
        fields.push(("originallyAvailableAt.locked".to_string(), "1".to_string()));
        changes.push(format!("release date changed to '{date}'"));
    }
    if let Some(studio) = &params.new_studio {
        fields.push(("studio.value".to_string(), studio.clone()));
        fields.push(("studio.locked".to_string(), "1".to_string()));
        changes.push(format!("studio changed to '{studio}'"));
    }
    if let Some(genre) = &params.add_genre {
        fields.push(("genre[0].tag.tag".to_string(), genre.clone()));
        fields.push(("genre.locked".to_string(), "1".to_string()));
        changes.push(format!("added genre '{genre}'"));
    }
    if let Some(genre) = &params.remove_genre {
        fields.push(("genre[].tag.tag-".to_string(), genre.clone()));
        fields.push(("genre.locked".to_string(), "1".to_string()));
        changes.push(format!("removed genre '{genre}'"));
    }
    if let Some(labels) = &params.add_labels {
        for (i, label) in labels.iter().enumerate() {
            fields.push((format!("label[{i}].tag.tag"), label.clone()));
            changes.push(format!("added label '{label}'"));
        }
        if !labels.is_empty() {
            fields.push(("label.locked".to_string(), "1".to_string()));
        }
    }
    (fields, changes)
}

fn base_details(item: &MediaItem) -> Map<String, Value> {
    let mut map = Map::new();
    map.insert("title".into(), item.title.clone().into());
    map.insert("type".into(), item.kind.clone().into());
    map.insert("id".into(), item.rating_key.clone().into());
    if let Some(year) = item.year {
        map.insert("year".into(), year.into());
    }
    if let Some(summary) = &item.summary {
        map.insert("summary".into(), summary.clone().into());
    }
    let rating = item.user_rating.or(item.rating);
    if let Some(rating) = rating {
        map.insert("rating".into(), rating.into());
    }
    if let Some(content_rating) = &item.content_rating {
        map.insert("content_rating".into(), content_rating.clone().into());
    }
    if let Some(duration) = item.duration {
        map.insert("duration".into(), format_duration_ms(duration).into());
    }
    if let Some(studio) = &item.studio {
        map.insert("studio".into(), studio.clone().into());
    }
    if let Some(added) = item.added_at {
        map.insert("added_at".into(), added.into());
    }
    if !item.genres.is_empty() {
        let tags: Vec<&str> = item.genres.iter().map(|t| t.tag.as_str()).collect();
        map.insert("genres".into(), json!(tags));
    }
    if !item.directors.is_empty() {
        let tags: Vec<&str> = item.directors.iter().map(|t| t.tag.as_str()).collect();
        map.insert("directors".into(), json!(tags));
    }
    if !item.writers.is_empty() {
        let tags: Vec<&str> = item.writers.iter().map(|t| t.tag.as_str()).collect();
        map.insert("writers".into(), json!(tags));
    }
    if !item.actors.is_empty() {
        let tags: Vec<&str> = item.actors.iter().map(|t| t.tag.as_str()).collect();
        map.insert("actors".into(), json!(tags));
    }
    if !item.labels.is_empty() {
        let tags: Vec<&str> = item.labels.iter().map(|t| t.tag.as_str()).collect();
        map.insert("labels".into(), json!(tags));
    }
    map
}

/// Pull in one level of children where the type calls for it: a show's
/// seasons, an artist's albums, an album's or season's episodes/tracks.
async fn detail_children(client: &PlexClient, item: &MediaItem, map: &mut Map<String, Value>) {
    let child_field = match item.kind.as_str() {
        "show" => Some("seasons"),
        "season" => Some("episodes"),
        "artist" => Some("albums"),
        "album" => Some("tracks"),
        _ => None,
    };
    let Some(field) = child_field else {
        return;
    };
    match client.item_children(&item.rating_key).await {
        Ok(children) => {
            map.insert(format!("{field}_count"), children.len().into());
            let listed: Vec<Value> = children
                .iter()
                .map(|child| {
                    let mut summary = item_summary(child);
                    if let Some(obj) = summary.as_object_mut() {
                        if let Some(leaves) = child.leaf_count {
                            obj.insert("episodes_count".into(), leaves.into());
                        }
                        if let Some(duration) = child.duration {
                            obj.insert("duration".into(), format_duration_ms(duration).into());
                        }
                    }
                    summary
                })
                .collect();
            map.insert(field.to_string(), listed.into());
        }
        Err(e) => {
            tracing::warn!("Failed to fetch children of {}: {e}", item.rating_key);
        }
    }
}

// === Tool Functions ===

pub async fn search(plex: &PlexHandle, params: SearchParams) -> Result<CallToolResult, McpError> {
    let client = match connect(plex).await {
        Ok(c) => c,
        Err(resp) => return resp,
    };
    let limit = params.limit.unwrap_or(100);
    let mut items = match client.search(&params.query, limit).await {
        Ok(items) => items,
        Err(e) => return shared::failure(format!("Error searching: {e}")),
    };
    if let Some(content_type) = &params.content_type {
        items.retain(|i| i.kind.eq_ignore_ascii_case(content_type));
    }
    if items.is_empty() {
        return shared::success(json!({
            "message": format!("No results found for '{}'", params.query),
            "query": params.query,
            "total_count": 0,
            "results_by_type": {},
        }));
    }

    let mut results = Map::new();
    for (kind, hits) in group_by_type(&items) {
        results.insert(kind, hits.into());
    }
    shared::success(json!({
        "query": params.query,
        "content_type": params.content_type,
        "total_count": items.len(),
        "results_by_type": results,
    }))
}

pub async fn get_details(
    plex: &PlexHandle,
    params: MediaRefParams,
) -> Result<CallToolResult, McpError> {
    let client = match connect(plex).await {
        Ok(c) => c,
        Err(resp) => return resp,
    };
    let item = match locate_media(
        client,
        params.media_title.as_deref(),
        params.media_id,
        params.library_name.as_deref(),
    )
    .await
    {
        Ok(item) => item,
        Err(resp) => return resp,
    };

    let mut details = base_details(&item);
    match item.kind.as_str() {
        "episode" => {
            if let Some(show) = &item.grandparent_title {
                details.insert("show_title".into(), show.clone().into());
            }
            if let Some(season) = item.parent_index {
                details.insert("season_number".into(), season.into());
            }
            if let Some(episode) = item.index {
                details.insert("episode_number".into(), episode.into());
            }
        }
        "track" => {
            if let Some(artist) = &item.grandparent_title {
                details.insert("artist".into(), artist.clone().into());
            }
            if let Some(album) = &item.parent_title {
                details.insert("album".into(), album.clone().into());
            }
            if let Some(number) = item.index {
                details.insert("track_number".into(), number.into());
            }
            details.insert("view_count".into(), item.view_count.unwrap_or(0).into());
            details.insert("skip_count".into(), item.skip_count.unwrap_or(0).into());
        }
        "album" => {
            if let Some(artist) = &item.parent_title {
                details.insert("artist".into(), artist.clone().into());
            }
        }
        _ => {}
    }
    detail_children(client, &item, &mut details).await;

    shared::success(details.into())
}

pub async fn edit_metadata(
    plex: &PlexHandle,
    params: EditMetadataParams,
) -> Result<CallToolResult, McpError> {
    let client = match connect(plex).await {
        Ok(c) => c,
        Err(resp) => return resp,
    };
    let (fields, mut changes) = build_edit_params(&params);
    if fields.is_empty() && params.new_rating.is_none() {
        return shared::failure("No metadata changes requested");
    }
    if let Some(rating) = params.new_rating {
        if !(0.0..=10.0).contains(&rating) {
            return shared::failure("Rating must be between 0 and 10");
        }
    }

    let item = match locate_media(
        client,
        params.media_title.as_deref(),
        params.media_id,
        params.library_name.as_deref(),
    )
    .await
    {
        Ok(item) => item,
        Err(resp) => return resp,
    };

    if !fields.is_empty() {
        if let Err(e) = client.edit_item(&item.rating_key, &fields).await {
            return shared::failure(format!("Error editing metadata: {e}"));
        }
    }
    if let Some(rating) = params.new_rating {
        if let Err(e) = client.rate_item(&item.rating_key, rating).await {
            return shared::failure(format!("Error setting rating: {e}"));
        }
        changes.push(format!("rating changed to {rating}"));
    }

    shared::success(json!({
        "title": item.title,
        "id": item.rating_key,
        "changes": changes,
    }))
}

pub async fn delete(plex: &PlexHandle, params: MediaRefParams) -> Result<CallToolResult, McpError> {
    let client = match connect(plex).await {
        Ok(c) => c,
        Err(resp) => return resp,
    };
    let item = match locate_media(
        client,
        params.media_title.as_deref(),
        params.media_id,
        params.library_name.as_deref(),
    )
    .await
    {
        Ok(item) => item,
        Err(resp) => return resp,
    };

    let files: Vec<String> = item
        .media
        .iter()
        .flat_map(|m| m.parts.iter())
        .filter_map(|p| p.file.clone())
        .collect();

    if let Err(e) = client.delete_item(&item.rating_key).await {
        return shared::failure(format!("Error during deletion: {e}"));
    }
    shared::success(json!({
        "deleted": true,
        "title": item.title,
        "type": item.kind,
        "files_on_disk": files,
    }))
}

pub async fn list_artwork(
    plex: &PlexHandle,
    params: ArtworkListParams,
) -> Result<CallToolResult, McpError> {
    let art_type = params.art_type.as_deref().unwrap_or("poster");
    let Some(endpoint) = art_endpoint(art_type) else {
        return shared::failure(format!(
            "Invalid art type: {art_type}. Supported types: poster, background, art, logo"
        ));
    };
    let client = match connect(plex).await {
        Ok(c) => c,
        Err(resp) => return resp,
    };
    let item = match locate_media(
        client,
        params.media_title.as_deref(),
        params.media_id,
        params.library_name.as_deref(),
    )
    .await
    {
        Ok(item) => item,
        Err(resp) => return resp,
    };

    let artwork = match client.list_artwork(&item.rating_key, endpoint).await {
        Ok(artwork) => artwork,
        Err(e) => return shared::failure(format!("Error retrieving {art_type} artwork: {e}")),
    };
    if artwork.is_empty() {
        return shared::failure(format!("No {art_type} artwork found for '{}'", item.title));
    }

    let listed: Vec<Value> = artwork
        .iter()
        .enumerate()
        .map(|(i, art)| {
            json!({
                "index": i + 1,
                "provider": art.provider,
                "url": art.key,
                "selected": art.selected.unwrap_or(false),
            })
        })
        .collect();
    shared::success(json!({
        "media_title": item.title,
        "media_id": item.rating_key,
        "art_type": art_type,
        "count": listed.len(),
        "artwork": listed,
    }))
}

pub async fn set_artwork(
    plex: &PlexHandle,
    params: SetArtworkParams,
) -> Result<CallToolResult, McpError> {
    let art_type = params.art_type.as_deref().unwrap_or("poster");
    let Some(endpoint) = art_endpoint(art_type) else {
        return shared::failure(format!(
            "Invalid art type: {art_type}. Supported types: poster, background, art, logo"
        ));
    };
    match (&params.url, &params.filepath) {
        (None, None) => return shared::failure("Either url or filepath must be provided"),
        (Some(_), Some(_)) => {
            return shared::failure("Provide either url or filepath, not both")
        }
        _ => {}
    }

    let client = match connect(plex).await {
        Ok(c) => c,
        Err(resp) => return resp,
    };
    let item = match locate_media(
        client,
        params.media_title.as_deref(),
        params.media_id,
        params.library_name.as_deref(),
    )
    .await
    {
        Ok(item) => item,
        Err(resp) => return resp,
    };

    if let Some(url) = &params.url {
        if let Err(e) = client.set_artwork_from_url(&item.rating_key, endpoint, url).await {
            return shared::failure(format!("Error setting {art_type} artwork: {e}"));
        }
    } else if let Some(filepath) = &params.filepath {
        let data = match tokio::fs::read(filepath).await {
            Ok(data) => data,
            Err(e) => return shared::failure(format!("Artwork file '{filepath}' unreadable: {e}")),
        };
        if let Err(e) = client.upload_artwork(&item.rating_key, endpoint, data).await {
            return shared::failure(format!("Error uploading {art_type} artwork: {e}"));
        }
    }

    let mut locked = false;
    if params.lock.unwrap_or(false) {
        match art_lock_field(endpoint) {
            Some(field) => {
                let fields = vec![(field.to_string(), "1".to_string())];
                if let Err(e) = client.edit_item(&item.rating_key, &fields).await {
                    return shared::failure(format!("Artwork set but lock failed: {e}"));
                }
                locked = true;
            }
            None => {
                return shared::failure(format!("Artwork set, but {art_type} cannot be locked"))
            }
        }
    }

    shared::success(json!({
        "title": item.title,
        "art_type": art_type,
        "locked": locked,
    }))
}

pub async fn get_artwork(
    plex: &PlexHandle,
    params: GetArtworkParams,
) -> Result<CallToolResult, McpError> {
    let output_format = params.output_format.as_deref().unwrap_or("base64");
    if output_format != "base64" && output_format != "url" {
        return shared::failure(format!(
            "Invalid output format: {output_format}. Supported: base64, url"
        ));
    }
    let client = match connect(plex).await {
        Ok(c) => c,
        Err(resp) => return resp,
    };
    let item = match locate_media(
        client,
        params.media_title.as_deref(),
        params.media_id,
        params.library_name.as_deref(),
    )
    .await
    {
        Ok(item) => item,
        Err(resp) => return resp,
    };

    let requested = params
        .image_types
        .unwrap_or_else(|| vec!["poster".to_string()]);
    let mut images = Map::new();
    for image_type in &requested {
        let path = match art_endpoint(image_type) {
            Some("posters") => item.thumb.clone(),
            Some("arts") => item.art.clone(),
            Some(_) => None,
            None => {
                images.insert(
                    image_type.clone(),
                    json!({"error": format!("Invalid image type: {image_type}")}),
                );
                continue;
            }
        };
        let Some(path) = path else {
            images.insert(
                image_type.clone(),
                json!({"error": format!("No {image_type} artwork on this item")}),
            );
            continue;
        };

        if output_format == "url" {
            images.insert(
                image_type.clone(),
                json!({
                    "filename": format!("{}_{}.jpg", item.title, image_type),
                    "url": client.image_url(&path),
                }),
            );
            continue;
        }
        match client.fetch_bytes(&path).await {
            Ok(data) => {
                images.insert(
                    image_type.clone(),
                    json!({
                        "filename": format!("{}_{}.jpg", item.title, image_type),
                        "base64": BASE64.encode(&data),
                    }),
                );
            }
            Err(e) => {
                images.insert(
                    image_type.clone(),
                    json!({"error": format!("Failed to download {image_type} image: {e}")}),
                );
            }
        }
    }

    shared::success(json!({
        "title": item.title,
        "id": item.rating_key,
        "images": images,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_art_endpoint_aliases() {
        assert_eq!(art_endpoint("poster"), Some("posters"));
        assert_eq!(art_endpoint("Background"), Some("arts"));
        assert_eq!(art_endpoint("art"), Some("arts"));
        assert_eq!(art_endpoint("logo"), Some("logos"));
        assert_eq!(art_endpoint("banner"), None);
    }

    #[test]
    fn test_group_by_type_orders_music_first() {
        let items = vec![
            MediaItem {
                title: "Heat".into(),
                kind: "movie".into(),
                ..Default::default()
            },
            MediaItem {
                title: "Heat Waves".into(),
                kind: "track".into(),
                ..Default::default()
            },
        ];
        let groups = group_by_type(&items);
        assert_eq!(groups[0].0, "track");
        assert_eq!(groups[1].0, "movie");
    }

    #[test]
    fn test_build_edit_params_locks_edited_fields() {
        let params = EditMetadataParams {
            media_title: Some("Heat".into()),
            media_id: None,
            library_name: None,
            new_title: Some("Heat (Remastered)".into()),
            new_summary: None,
            new_rating: None,
            new_release_date: None,
            new_studio: None,
            add_genre: Some("Crime".into()),
            remove_genre: None,
            add_labels: Some(vec!["favorite".into()]),
        };
        let (fields, changes) = build_edit_params(&params);
        assert!(fields.contains(&("title.value".to_string(), "Heat (Remastered)".to_string())));
        assert!(fields.contains(&("title.locked".to_string(), "1".to_string())));
        assert!(fields.contains(&("genre[0].tag.tag".to_string(), "Crime".to_string())));
        assert!(fields.contains(&("label[0].tag.tag".to_string(), "favorite".to_string())));
        assert_eq!(changes.len(), 3);
    }

    #[test]
    fn test_build_edit_params_empty_when_nothing_requested() {
        let params = EditMetadataParams {
            media_title: Some("Heat".into()),
            media_id: None,
            library_name: None,
            new_title: None,
            new_summary: None,
            new_rating: None,
            new_release_date: None,
            new_studio: None,
            add_genre: None,
            remove_genre: None,
            add_labels: None,
        };
        let (fields, changes) = build_edit_params(&params);
        assert!(fields.is_empty());
        assert!(changes.is_empty());
    }
}
