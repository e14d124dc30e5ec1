//! Tool implementations, grouped by domain.
//!
//! Each module holds its parameter structs and the tool bodies; the
//! router in main.rs only dispatches. Tools convert every failure to the
//! error envelope at this boundary - nothing below returns a raw
//! transport error.

pub mod client;
pub mod collection;
pub mod library;
pub mod media;
pub mod playlist;
pub mod server;
pub mod sessions;
pub mod user;

use rmcp::{model::CallToolResult, ErrorData as McpError};
use serde_json::Value;

use crate::plex::types::MediaItem;
use crate::plex::{PlexClient, PlexHandle};
use crate::shared;
use crate::shared::resolve::{resolve_title, Resolution};

/// Either a value or a ready-to-return envelope.
pub(crate) type ToolStep<T> = Result<T, Result<CallToolResult, McpError>>;

/// Connect (or reuse) the process-wide client, converting failures to the
/// error envelope.
pub(crate) async fn connect(plex: &PlexHandle) -> ToolStep<&PlexClient> {
    plex.client()
        .await
        .map_err(|e| shared::failure(format!("Failed to connect to Plex: {e}")))
}

/// Candidate fetch for a title lookup: server-wide hub search, or a
/// title-filtered listing of one section.
pub(crate) async fn search_scope(
    client: &PlexClient,
    title: &str,
    library: Option<&str>,
) -> ToolStep<Vec<MediaItem>> {
    match library {
        Some(name) => {
            let section = match client.section_by_title(name).await {
                Ok(Some(section)) => section,
                Ok(None) => return Err(shared::failure(format!("Library '{name}' not found"))),
                Err(e) => return Err(shared::failure(format!("Error listing libraries: {e}"))),
            };
            let mut items = match client.section_items(&section.key, Some(title), None).await {
                Ok(items) => items,
                Err(e) => {
                    return Err(shared::failure(format!(
                        "Error searching library '{name}': {e}"
                    )))
                }
            };
            // Show libraries match episodes too when the show-level search
            // comes up empty.
            if items.is_empty() && section.kind == "show" {
                items = match client
                    .section_items(&section.key, Some(title), crate::plex::type_code("episode"))
                    .await
                {
                    Ok(items) => items,
                    Err(e) => {
                        return Err(shared::failure(format!(
                            "Error searching library '{name}': {e}"
                        )))
                    }
                };
            }
            Ok(items)
        }
        None => client
            .search(title, 50)
            .await
            .map_err(|e| shared::failure(format!("Error searching: {e}"))),
    }
}

/// Resolve a media item from an optional title and optional explicit id.
/// The id path bypasses name resolution entirely.
pub(crate) async fn locate_media(
    client: &PlexClient,
    title: Option<&str>,
    id: Option<i64>,
    library: Option<&str>,
) -> ToolStep<MediaItem> {
    if let Some(id) = id {
        return match client.fetch_item(&id.to_string()).await {
            Ok(Some(item)) => Ok(item),
            Ok(None) => Err(shared::failure(format!("No media found with id {id}"))),
            Err(e) => Err(shared::failure(format!("Error fetching media {id}: {e}"))),
        };
    }

    let Some(title) = title else {
        return Err(shared::failure(
            "Either media_title or media_id must be provided",
        ));
    };

    let candidates = search_scope(client, title, library).await?;
    match resolve_title(title, candidates) {
        Resolution::One(item) => Ok(*item),
        Resolution::NotFound => Err(shared::failure(format!(
            "No media found matching '{title}'"
        ))),
        Resolution::Ambiguous(matches) => Err(shared::disambiguation(
            format!("Multiple items matched '{title}'. Narrow the search or pass media_id."),
            &matches,
        )),
    }
}

/// Compact JSON summary of one item, with the per-type context a caller
/// needs to tell entries apart.
pub(crate) fn item_summary(item: &MediaItem) -> Value {
    let mut map = serde_json::Map::new();
    map.insert("title".into(), item.title.clone().into());
    map.insert("type".into(), item.kind.clone().into());
    map.insert("id".into(), item.rating_key.clone().into());
    if let Some(year) = item.year {
        map.insert("year".into(), year.into());
    }
    match item.kind.as_str() {
        "episode" => {
            if let Some(show) = &item.grandparent_title {
                map.insert("show".into(), show.clone().into());
            }
            if let Some(season) = item.parent_index {
                map.insert("season".into(), season.into());
            }
            if let Some(episode) = item.index {
                map.insert("episode".into(), episode.into());
            }
        }
        "season" => {
            if let Some(show) = &item.parent_title {
                map.insert("show".into(), show.clone().into());
            }
            if let Some(season) = item.index {
                map.insert("season_number".into(), season.into());
            }
        }
        "track" => {
            if let Some(artist) = &item.grandparent_title {
                map.insert("artist".into(), artist.clone().into());
            }
            if let Some(album) = &item.parent_title {
                map.insert("album".into(), album.clone().into());
            }
            if let Some(number) = item.index {
                map.insert("track_number".into(), number.into());
            }
        }
        "album" => {
            if let Some(artist) = &item.parent_title {
                map.insert("artist".into(), artist.clone().into());
            }
        }
        _ => {}
    }
    if let Some(library) = &item.library_section_title {
        map.insert("library".into(), library.clone().into());
    }
    Value::Object(map)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_item_summary_episode_context() {
        let item = MediaItem {
            title: "Pilot".into(),
            kind: "episode".into(),
            rating_key: "55".into(),
            grandparent_title: Some("Some Show".into()),
            parent_index: Some(1),
            index: Some(3),
            ..Default::default()
        };
        let summary = item_summary(&item);
        assert_eq!(summary["show"], "Some Show");
        assert_eq!(summary["season"], 1);
        assert_eq!(summary["episode"], 3);
    }

    #[test]
    fn test_item_summary_movie_is_flat() {
        let item = MediaItem {
            title: "Heat".into(),
            kind: "movie".into(),
            rating_key: "101".into(),
            year: Some(1995),
            ..Default::default()
        };
        let summary = item_summary(&item);
        assert_eq!(summary["year"], 1995);
        assert!(summary.get("show").is_none());
    }
}
