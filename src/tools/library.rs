//! Library section tools: listing, stats, refresh/scan, contents.

use std::collections::HashMap;

use rmcp::{model::CallToolResult, ErrorData as McpError};
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::json;

use crate::plex::types::MediaItem;
use crate::plex::PlexHandle;
use crate::shared::{self, format_duration_ms};

use super::{connect, item_summary};

// === Parameter Types ===

#[derive(Debug, Deserialize, JsonSchema)]
pub struct LibraryNameParams {
    #[schemars(description = "Library section name (case-insensitive)")]
    pub library_name: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct RefreshParams {
    #[schemars(description = "Library to refresh (all libraries when omitted)")]
    pub library_name: Option<String>,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct ScanParams {
    #[schemars(description = "Library section name (case-insensitive)")]
    pub library_name: String,
    #[schemars(description = "Scan only this folder path inside the library")]
    pub path: Option<String>,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct RecentlyAddedParams {
    #[schemars(description = "Number of items to return (default: 50)")]
    pub count: Option<usize>,
    #[schemars(description = "Limit results to one library")]
    pub library_name: Option<String>,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct ContentsParams {
    #[schemars(description = "Library section name (case-insensitive)")]
    pub library_name: String,
    #[schemars(description = "Maximum number of items to return (default: 100)")]
    pub limit: Option<usize>,
    #[schemars(description = "Number of items to skip (default: 0)")]
    pub offset: Option<usize>,
    #[schemars(description = "Only watched (true) or unwatched (false) items")]
    pub watched: Option<bool>,
    #[schemars(description = "Only items with this genre")]
    pub genre: Option<String>,
    #[schemars(description = "Only items from this release year")]
    pub year: Option<i32>,
    #[schemars(description = "Only items rated at least this (0-10)")]
    pub min_rating: Option<f64>,
    #[schemars(description = "Only items featuring this person (actor, director or writer)")]
    pub person: Option<String>,
    #[schemars(description = "Only items with this video resolution (e.g. 1080, 4k)")]
    pub resolution: Option<String>,
    #[schemars(description = "Only items from this studio")]
    pub studio: Option<String>,
    #[schemars(description = "Only shows from this network")]
    pub network: Option<String>,
}

// === Helper Functions ===

/// A show counts as watched when every episode is; anything else goes by
/// its play count.
fn is_watched(item: &MediaItem) -> bool {
    if let Some(leaves) = item.leaf_count {
        if leaves > 0 {
            return item.viewed_leaf_count.unwrap_or(0) >= leaves;
        }
    }
    item.view_count.unwrap_or(0) > 0
}

fn matches_filters(item: &MediaItem, params: &ContentsParams) -> bool {
    if let Some(watched) = params.watched {
        if is_watched(item) != watched {
            return false;
        }
    }
    if let Some(genre) = &params.genre {
        if !item.genres.iter().any(|g| g.tag.eq_ignore_ascii_case(genre)) {
            return false;
        }
    }
    if let Some(year) = params.year {
        if item.year != Some(year) {
            return false;
        }
    }
    if let Some(min) = params.min_rating {
        let rating = item.user_rating.or(item.rating);
        if rating.map_or(true, |r| r < min) {
            return false;
        }
    }
    if let Some(person) = &params.person {
        let wanted = person.to_lowercase();
        let mut people = item
            .actors
            .iter()
            .chain(item.directors.iter())
            .chain(item.writers.iter());
        if !people.any(|t| t.tag.to_lowercase().contains(&wanted)) {
            return false;
        }
    }
    if let Some(resolution) = &params.resolution {
        let hit = item.media.iter().any(|m| {
            m.video_resolution
                .as_deref()
                .is_some_and(|r| r.eq_ignore_ascii_case(resolution))
        });
        if !hit {
            return false;
        }
    }
    if let Some(studio) = &params.studio {
        if !item
            .studio
            .as_deref()
            .is_some_and(|s| s.eq_ignore_ascii_case(studio))
        {
            return false;
        }
    }
    // Shows keep their network in the studio attribute.
    if let Some(network) = &params.network {
        if !item
            .studio
            .as_deref()
            .is_some_and(|s| s.eq_ignore_ascii_case(network))
        {
            return false;
        }
    }
    true
}

fn apply_filters(items: Vec<MediaItem>, params: &ContentsParams) -> Vec<MediaItem> {
    items
        .into_iter()
        .filter(|item| matches_filters(item, params))
        .collect()
}

/// Top-N tally of tag occurrences, most frequent first.
fn top_counts(counts: HashMap<String, usize>, n: usize) -> Vec<serde_json::Value> {
    let mut pairs: Vec<(String, usize)> = counts.into_iter().collect();
    pairs.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    pairs
        .into_iter()
        .take(n)
        .map(|(name, count)| json!({"name": name, "count": count}))
        .collect()
}

// === Tool Functions ===

pub async fn list(plex: &PlexHandle) -> Result<CallToolResult, McpError> {
    let client = match connect(plex).await {
        Ok(c) => c,
        Err(resp) => return resp,
    };
    let sections = match client.sections().await {
        Ok(s) => s,
        Err(e) => return shared::failure(format!("Error listing libraries: {e}")),
    };
    if sections.is_empty() {
        return shared::failure("No libraries found on the Plex server");
    }

    let mut libraries = Vec::new();
    for section in &sections {
        let size = client.section_size(&section.key).await.ok().flatten();
        libraries.push(json!({
            "title": section.title,
            "type": section.kind,
            "key": section.key,
            "item_count": size,
        }));
    }
    shared::success(json!({"count": libraries.len(), "libraries": libraries}))
}

pub async fn get_stats(
    plex: &PlexHandle,
    params: LibraryNameParams,
) -> Result<CallToolResult, McpError> {
    let client = match connect(plex).await {
        Ok(c) => c,
        Err(resp) => return resp,
    };
    let section = match client.section_by_title(&params.library_name).await {
        Ok(Some(s)) => s,
        Ok(None) => {
            return shared::failure(format!("Library '{}' not found", params.library_name))
        }
        Err(e) => return shared::failure(format!("Error listing libraries: {e}")),
    };
    let items = match client.section_items(&section.key, None, None).await {
        Ok(items) => items,
        Err(e) => return shared::failure(format!("Error getting library stats: {e}")),
    };

    let mut stats = serde_json::Map::new();
    stats.insert("library".into(), section.title.clone().into());
    stats.insert("type".into(), section.kind.clone().into());
    stats.insert("total_items".into(), items.len().into());

    match section.kind.as_str() {
        "movie" => {
            let unwatched = items.iter().filter(|i| !is_watched(i)).count();
            stats.insert("unwatched".into(), unwatched.into());

            let mut genres: HashMap<String, usize> = HashMap::new();
            let mut directors: HashMap<String, usize> = HashMap::new();
            let mut studios: HashMap<String, usize> = HashMap::new();
            let mut decades: HashMap<String, usize> = HashMap::new();
            for item in &items {
                for genre in &item.genres {
                    *genres.entry(genre.tag.clone()).or_default() += 1;
                }
                for director in &item.directors {
                    *directors.entry(director.tag.clone()).or_default() += 1;
                }
                if let Some(studio) = &item.studio {
                    *studios.entry(studio.clone()).or_default() += 1;
                }
                if let Some(year) = item.year {
                    let decade = (year / 10) * 10;
                    *decades.entry(format!("{decade}s")).or_default() += 1;
                }
            }
            stats.insert("top_genres".into(), top_counts(genres, 5).into());
            stats.insert("top_directors".into(), top_counts(directors, 5).into());
            stats.insert("top_studios".into(), top_counts(studios, 5).into());
            let mut by_decade: Vec<(String, usize)> = decades.into_iter().collect();
            by_decade.sort();
            stats.insert(
                "by_decade".into(),
                by_decade
                    .into_iter()
                    .map(|(decade, count)| json!({"decade": decade, "count": count}))
                    .collect::<Vec<_>>()
                    .into(),
            );
        }
        "show" => {
            let seasons: i64 = items.iter().filter_map(|i| i.child_count).sum();
            let episodes: i64 = items.iter().filter_map(|i| i.leaf_count).sum();
            let unwatched = items.iter().filter(|i| !is_watched(i)).count();
            stats.insert("seasons".into(), seasons.into());
            stats.insert("episodes".into(), episodes.into());
            stats.insert("unwatched_shows".into(), unwatched.into());
        }
        "artist" => {
            let albums: i64 = items.iter().filter_map(|i| i.child_count).sum();
            let tracks: i64 = items.iter().filter_map(|i| i.leaf_count).sum();
            stats.insert("albums".into(), albums.into());
            stats.insert("tracks".into(), tracks.into());
        }
        _ => {}
    }

    shared::success(stats.into())
}

pub async fn get_details(
    plex: &PlexHandle,
    params: LibraryNameParams,
) -> Result<CallToolResult, McpError> {
    let client = match connect(plex).await {
        Ok(c) => c,
        Err(resp) => return resp,
    };
    let section = match client.section_by_title(&params.library_name).await {
        Ok(Some(s)) => s,
        Ok(None) => {
            return shared::failure(format!("Library '{}' not found", params.library_name))
        }
        Err(e) => return shared::failure(format!("Error listing libraries: {e}")),
    };
    let size = client.section_size(&section.key).await.ok().flatten();
    let locations: Vec<&str> = section
        .locations
        .iter()
        .filter_map(|l| l.path.as_deref())
        .collect();
    shared::success(json!({
        "title": section.title,
        "type": section.kind,
        "key": section.key,
        "uuid": section.uuid,
        "total_items": size,
        "locations": locations,
        "agent": section.agent,
        "scanner": section.scanner,
        "language": section.language,
    }))
}

pub async fn refresh(plex: &PlexHandle, params: RefreshParams) -> Result<CallToolResult, McpError> {
    let client = match connect(plex).await {
        Ok(c) => c,
        Err(resp) => return resp,
    };
    match &params.library_name {
        Some(name) => {
            let section = match client.section_by_title(name).await {
                Ok(Some(s)) => s,
                Ok(None) => return shared::failure(format!("Library '{name}' not found")),
                Err(e) => return shared::failure(format!("Error listing libraries: {e}")),
            };
            if let Err(e) = client.refresh_section(&section.key).await {
                return shared::failure(format!("Error refreshing library: {e}"));
            }
            shared::success(json!({
                "message": format!("Refreshing library '{}'. This may take some time.", section.title)
            }))
        }
        None => {
            if let Err(e) = client.refresh_all_sections().await {
                return shared::failure(format!("Error refreshing libraries: {e}"));
            }
            shared::success(json!({
                "message": "Refreshing all libraries. This may take some time."
            }))
        }
    }
}

pub async fn scan(plex: &PlexHandle, params: ScanParams) -> Result<CallToolResult, McpError> {
    let client = match connect(plex).await {
        Ok(c) => c,
        Err(resp) => return resp,
    };
    let section = match client.section_by_title(&params.library_name).await {
        Ok(Some(s)) => s,
        Ok(None) => {
            return shared::failure(format!("Library '{}' not found", params.library_name))
        }
        Err(e) => return shared::failure(format!("Error listing libraries: {e}")),
    };
    if let Err(e) = client.scan_section(&section.key, params.path.as_deref()).await {
        return shared::failure(format!("Error scanning library: {e}"));
    }
    let message = match params.path {
        Some(path) => format!(
            "Scanning path '{}' in library '{}'. This may take some time.",
            path, section.title
        ),
        None => format!(
            "Scanning library '{}'. This may take some time.",
            section.title
        ),
    };
    shared::success(json!({"message": message}))
}

pub async fn get_recently_added(
    plex: &PlexHandle,
    params: RecentlyAddedParams,
) -> Result<CallToolResult, McpError> {
    let client = match connect(plex).await {
        Ok(c) => c,
        Err(resp) => return resp,
    };
    let count = params.count.unwrap_or(50);

    let items = match &params.library_name {
        Some(name) => {
            let section = match client.section_by_title(name).await {
                Ok(Some(s)) => s,
                Ok(None) => return shared::failure(format!("Library '{name}' not found")),
                Err(e) => return shared::failure(format!("Error listing libraries: {e}")),
            };
            client.section_recently_added(&section.key, count).await
        }
        None => client.recently_added(count).await,
    };
    let mut items = match items {
        Ok(items) => items,
        Err(e) => return shared::failure(format!("Error getting recently added items: {e}")),
    };
    if items.is_empty() {
        return shared::failure("No recently added items found");
    }
    items.sort_by(|a, b| b.added_at.cmp(&a.added_at));
    items.truncate(count);

    let listed: Vec<serde_json::Value> = items
        .iter()
        .map(|item| {
            let mut summary = item_summary(item);
            if let (Some(obj), Some(added)) = (summary.as_object_mut(), item.added_at) {
                obj.insert("added_at".into(), added.into());
            }
            summary
        })
        .collect();
    shared::success(json!({"count": listed.len(), "items": listed}))
}

pub async fn get_contents(
    plex: &PlexHandle,
    params: ContentsParams,
) -> Result<CallToolResult, McpError> {
    let client = match connect(plex).await {
        Ok(c) => c,
        Err(resp) => return resp,
    };
    let section = match client.section_by_title(&params.library_name).await {
        Ok(Some(s)) => s,
        Ok(None) => {
            return shared::failure(format!("Library '{}' not found", params.library_name))
        }
        Err(e) => return shared::failure(format!("Error listing libraries: {e}")),
    };
    let items = match client.section_items(&section.key, None, None).await {
        Ok(items) => items,
        Err(e) => return shared::failure(format!("Error getting library contents: {e}")),
    };

    let filtered = apply_filters(items, &params);
    let total = filtered.len();
    let offset = params.offset.unwrap_or(0);
    let limit = params.limit.unwrap_or(100);

    let page: Vec<serde_json::Value> = filtered
        .iter()
        .skip(offset)
        .take(limit)
        .map(|item| {
            let mut summary = item_summary(item);
            if let Some(obj) = summary.as_object_mut() {
                obj.insert("watched".into(), is_watched(item).into());
                if let Some(duration) = item.duration {
                    obj.insert("duration".into(), format_duration_ms(duration).into());
                }
                if let Some(resolution) = item
                    .media
                    .first()
                    .and_then(|m| m.video_resolution.as_deref())
                {
                    obj.insert("resolution".into(), resolution.into());
                }
            }
            summary
        })
        .collect();

    shared::success(json!({
        "library": section.title,
        "total": total,
        "offset": offset,
        "limit": limit,
        "items": page,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plex::types::{Media, Tag};

    fn params() -> ContentsParams {
        ContentsParams {
            library_name: "Movies".into(),
            limit: None,
            offset: None,
            watched: None,
            genre: None,
            year: None,
            min_rating: None,
            person: None,
            resolution: None,
            studio: None,
            network: None,
        }
    }

    fn movie(title: &str, view_count: i64) -> MediaItem {
        MediaItem {
            title: title.into(),
            kind: "movie".into(),
            view_count: Some(view_count),
            ..Default::default()
        }
    }

    #[test]
    fn test_watched_filter_requires_nonzero_play_count() {
        let items = vec![movie("Seen", 2), movie("Unseen", 0), movie("Unknown", 0)];
        let filtered = apply_filters(
            items,
            &ContentsParams {
                watched: Some(true),
                ..params()
            },
        );
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].title, "Seen");
    }

    #[test]
    fn test_unwatched_filter_is_the_complement() {
        let items = vec![movie("Seen", 1), movie("Unseen", 0)];
        let filtered = apply_filters(
            items,
            &ContentsParams {
                watched: Some(false),
                ..params()
            },
        );
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].title, "Unseen");
    }

    #[test]
    fn test_fully_watched_show_counts_as_watched() {
        let show = MediaItem {
            title: "Done".into(),
            kind: "show".into(),
            leaf_count: Some(10),
            viewed_leaf_count: Some(10),
            ..Default::default()
        };
        let in_progress = MediaItem {
            title: "Going".into(),
            kind: "show".into(),
            leaf_count: Some(10),
            viewed_leaf_count: Some(3),
            ..Default::default()
        };
        assert!(is_watched(&show));
        assert!(!is_watched(&in_progress));
    }

    #[test]
    fn test_genre_and_year_filters() {
        let mut heat = movie("Heat", 0);
        heat.year = Some(1995);
        heat.genres = vec![Tag {
            tag: "Crime".into(),
            id: None,
        }];
        let mut other = movie("Other", 0);
        other.year = Some(2001);

        let filtered = apply_filters(
            vec![heat, other],
            &ContentsParams {
                genre: Some("crime".into()),
                year: Some(1995),
                ..params()
            },
        );
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].title, "Heat");
    }

    #[test]
    fn test_resolution_filter_checks_all_media_parts() {
        let mut item = movie("Heat", 0);
        item.media = vec![Media {
            video_resolution: Some("4k".into()),
            ..Default::default()
        }];
        let filtered = apply_filters(
            vec![item, movie("SD", 0)],
            &ContentsParams {
                resolution: Some("4K".into()),
                ..params()
            },
        );
        assert_eq!(filtered.len(), 1);
    }

    #[test]
    fn test_person_filter_spans_cast_and_crew() {
        let mut item = movie("Heat", 0);
        item.directors = vec![Tag {
            tag: "Michael Mann".into(),
            id: None,
        }];
        let filtered = apply_filters(
            vec![item, movie("Other", 0)],
            &ContentsParams {
                person: Some("mann".into()),
                ..params()
            },
        );
        assert_eq!(filtered.len(), 1);
    }

    #[test]
    fn test_min_rating_excludes_unrated() {
        let mut rated = movie("Rated", 0);
        rated.rating = Some(8.4);
        let filtered = apply_filters(
            vec![rated, movie("Unrated", 0)],
            &ContentsParams {
                min_rating: Some(7.0),
                ..params()
            },
        );
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].title, "Rated");
    }

    #[test]
    fn test_top_counts_orders_and_truncates() {
        let mut counts = HashMap::new();
        counts.insert("Crime".to_string(), 5);
        counts.insert("Drama".to_string(), 9);
        counts.insert("Comedy".to_string(), 2);
        let top = top_counts(counts, 2);
        assert_eq!(top.len(), 2);
        assert_eq!(top[0]["name"], "Drama");
        assert_eq!(top[1]["name"], "Crime");
    }
}
