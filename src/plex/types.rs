//! Serde models for Plex Media Server JSON payloads.
//!
//! Every PMS endpoint wraps its payload in a `MediaContainer`; plex.tv v2
//! endpoints return bare JSON. Fields are optional unless the server is
//! known to always send them - Plex omits attributes rather than nulling
//! them.

use serde::Deserialize;

/// Outer wrapper for every PMS response.
#[derive(Debug, Deserialize)]
pub struct MediaContainer<T> {
    #[serde(rename = "MediaContainer")]
    pub media_container: T,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemsContainer {
    #[serde(default)]
    pub size: i64,
    pub total_size: Option<i64>,
    #[serde(rename = "Metadata", default)]
    pub metadata: Vec<MediaItem>,
}

#[derive(Debug, Default, Deserialize)]
pub struct DirectoryContainer {
    #[serde(rename = "Directory", default)]
    pub directory: Vec<Section>,
}

/// A library section (`/library/sections`).
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Section {
    #[serde(default)]
    pub key: String,
    #[serde(default)]
    pub title: String,
    #[serde(rename = "type", default)]
    pub kind: String,
    pub uuid: Option<String>,
    pub agent: Option<String>,
    pub scanner: Option<String>,
    pub language: Option<String>,
    #[serde(rename = "Location", default)]
    pub locations: Vec<Location>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Location {
    pub id: Option<i64>,
    pub path: Option<String>,
}

/// One metadata item: movie, show, season, episode, artist, album, track,
/// playlist, collection, or a history row. The same shape serves all of
/// them; absent attributes stay `None`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaItem {
    #[serde(default)]
    pub rating_key: String,
    #[serde(default)]
    pub key: String,
    #[serde(default)]
    pub title: String,
    #[serde(rename = "type", default)]
    pub kind: String,
    pub year: Option<i32>,
    pub summary: Option<String>,
    pub rating: Option<f64>,
    pub user_rating: Option<f64>,
    pub content_rating: Option<String>,
    pub duration: Option<i64>,
    pub added_at: Option<i64>,
    pub originally_available_at: Option<String>,
    pub view_count: Option<i64>,
    pub skip_count: Option<i64>,
    pub last_viewed_at: Option<i64>,
    pub view_offset: Option<i64>,
    pub index: Option<i32>,
    pub parent_index: Option<i32>,
    pub parent_title: Option<String>,
    pub grandparent_title: Option<String>,
    pub parent_rating_key: Option<String>,
    pub grandparent_rating_key: Option<String>,
    pub library_section_title: Option<String>,
    #[serde(rename = "librarySectionID")]
    pub library_section_id: Option<i64>,
    pub studio: Option<String>,
    pub leaf_count: Option<i64>,
    pub viewed_leaf_count: Option<i64>,
    pub child_count: Option<i64>,
    pub playlist_type: Option<String>,
    pub smart: Option<bool>,
    #[serde(rename = "playlistItemID")]
    pub playlist_item_id: Option<i64>,
    pub thumb: Option<String>,
    pub art: Option<String>,
    // History rows only.
    #[serde(rename = "accountID")]
    pub account_id: Option<i64>,
    #[serde(rename = "deviceID")]
    pub device_id: Option<i64>,
    pub viewed_at: Option<i64>,
    #[serde(rename = "Genre", default)]
    pub genres: Vec<Tag>,
    #[serde(rename = "Director", default)]
    pub directors: Vec<Tag>,
    #[serde(rename = "Writer", default)]
    pub writers: Vec<Tag>,
    #[serde(rename = "Role", default)]
    pub actors: Vec<Tag>,
    #[serde(rename = "Label", default)]
    pub labels: Vec<Tag>,
    #[serde(rename = "Media", default)]
    pub media: Vec<Media>,
    // Session rows only.
    #[serde(rename = "Player")]
    pub player: Option<Player>,
    #[serde(rename = "User")]
    pub user: Option<SessionUser>,
    #[serde(rename = "TranscodeSession")]
    pub transcode_session: Option<TranscodeSession>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Tag {
    #[serde(default)]
    pub tag: String,
    pub id: Option<i64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Media {
    pub id: Option<i64>,
    pub bitrate: Option<i64>,
    pub video_resolution: Option<String>,
    pub video_codec: Option<String>,
    pub audio_codec: Option<String>,
    pub container: Option<String>,
    pub width: Option<i64>,
    pub height: Option<i64>,
    #[serde(rename = "Part", default)]
    pub parts: Vec<Part>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Part {
    pub id: Option<i64>,
    pub file: Option<String>,
}

/// The player half of an active session.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Player {
    #[serde(default)]
    pub title: String,
    pub address: Option<String>,
    pub device: Option<String>,
    pub machine_identifier: Option<String>,
    pub model: Option<String>,
    pub platform: Option<String>,
    pub platform_version: Option<String>,
    pub product: Option<String>,
    pub state: Option<String>,
    pub version: Option<String>,
    pub local: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SessionUser {
    pub id: Option<i64>,
    pub title: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranscodeSession {
    pub video_decision: Option<String>,
    pub audio_decision: Option<String>,
    pub video_codec: Option<String>,
    pub audio_codec: Option<String>,
    pub source_video_codec: Option<String>,
    pub source_audio_codec: Option<String>,
    pub source_video_resolution: Option<String>,
    pub width: Option<i64>,
    pub height: Option<i64>,
    pub speed: Option<f64>,
    pub throttled: Option<bool>,
    pub progress: Option<f64>,
}

/// Attributes of the root container (`GET /`).
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerRoot {
    pub friendly_name: Option<String>,
    pub machine_identifier: Option<String>,
    pub version: Option<String>,
    pub platform: Option<String>,
    pub platform_version: Option<String>,
    pub my_plex_username: Option<String>,
    pub my_plex_mapping_state: Option<String>,
    pub updated_at: Option<i64>,
    pub transcoder_active_video_sessions: Option<i64>,
    pub transcoder_audio: Option<bool>,
    pub transcoder_video: Option<bool>,
    pub transcoder_video_bitrates: Option<String>,
    pub transcoder_video_qualities: Option<String>,
    pub transcoder_video_resolutions: Option<String>,
    pub streaming_brain_version: Option<i64>,
    pub owner_features: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    pub machine_identifier: Option<String>,
    pub version: Option<String>,
}

/// `GET /clients` rows (the element is named `Server` on the wire).
#[derive(Debug, Default, Deserialize)]
pub struct ClientsContainer {
    #[serde(rename = "Server", default)]
    pub server: Vec<ClientEntry>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientEntry {
    #[serde(default)]
    pub name: String,
    pub host: Option<String>,
    pub address: Option<String>,
    pub port: Option<i64>,
    pub machine_identifier: Option<String>,
    pub version: Option<String>,
    pub protocol: Option<String>,
    pub product: Option<String>,
    pub device_class: Option<String>,
    pub protocol_version: Option<String>,
    /// Comma-separated list, e.g. "timeline,playback,navigation,playqueues".
    pub protocol_capabilities: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct AccountsContainer {
    #[serde(rename = "Account", default)]
    pub account: Vec<AccountEntry>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AccountEntry {
    #[serde(default)]
    pub id: i64,
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct DevicesContainer {
    #[serde(rename = "Device", default)]
    pub device: Vec<DeviceEntry>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceEntry {
    #[serde(default)]
    pub id: i64,
    #[serde(default)]
    pub name: String,
    pub platform: Option<String>,
    pub client_identifier: Option<String>,
    pub created_at: Option<i64>,
}

/// `/statistics/bandwidth` and `/statistics/resources` share a container
/// that also carries the account and device dimension tables.
#[derive(Debug, Default, Deserialize)]
pub struct StatisticsContainer {
    #[serde(rename = "Device", default)]
    pub devices: Vec<DeviceEntry>,
    #[serde(rename = "Account", default)]
    pub accounts: Vec<AccountEntry>,
    #[serde(rename = "StatisticsBandwidth", default)]
    pub bandwidth: Vec<BandwidthSample>,
    #[serde(rename = "StatisticsResources", default)]
    pub resources: Vec<ResourceSample>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BandwidthSample {
    #[serde(rename = "accountID")]
    pub account_id: Option<i64>,
    #[serde(rename = "deviceID")]
    pub device_id: Option<i64>,
    pub timespan: Option<i64>,
    pub at: Option<i64>,
    pub lan: Option<bool>,
    pub bytes: Option<i64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceSample {
    pub at: Option<i64>,
    pub timespan: Option<i64>,
    pub host_cpu_utilization: Option<f64>,
    pub host_memory_utilization: Option<f64>,
    pub process_cpu_utilization: Option<f64>,
    pub process_memory_utilization: Option<f64>,
}

/// `GET /butler` uses its own wrapper element instead of `MediaContainer`.
#[derive(Debug, Deserialize)]
pub struct ButlerTasksEnvelope {
    #[serde(rename = "ButlerTasks")]
    pub butler_tasks: ButlerTasks,
}

#[derive(Debug, Default, Deserialize)]
pub struct ButlerTasks {
    #[serde(rename = "ButlerTask", default)]
    pub tasks: Vec<ButlerTask>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ButlerTask {
    #[serde(default)]
    pub name: String,
    pub title: Option<String>,
    pub description: Option<String>,
    pub interval: Option<i64>,
    pub enabled: Option<bool>,
    pub schedule_randomized: Option<bool>,
}

/// `/library/search` rows; the hub search scores each hit.
#[derive(Debug, Default, Deserialize)]
pub struct SearchContainer {
    #[serde(rename = "SearchResult", default)]
    pub search_result: Vec<SearchResult>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SearchResult {
    pub score: Option<f64>,
    #[serde(rename = "Metadata")]
    pub metadata: Option<MediaItem>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayQueue {
    #[serde(rename = "playQueueID")]
    pub id: Option<i64>,
    #[serde(rename = "playQueueSelectedItemID")]
    pub selected_item_id: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct TimelineContainer {
    #[serde(rename = "Timeline", default)]
    pub timeline: Vec<TimelineEntry>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimelineEntry {
    #[serde(rename = "type", default)]
    pub kind: String,
    pub state: Option<String>,
    pub time: Option<i64>,
    pub duration: Option<i64>,
    pub rating_key: Option<String>,
    pub key: Option<String>,
    #[serde(rename = "playQueueItemID")]
    pub play_queue_item_id: Option<i64>,
    pub volume: Option<i64>,
    pub muted: Option<i64>,
    pub shuffled: Option<i64>,
    #[serde(rename = "repeat")]
    pub repeat_mode: Option<i64>,
    pub controllable: Option<String>,
}

/// Available artwork rows (`/library/metadata/{id}/posters` etc).
#[derive(Debug, Default, Deserialize)]
pub struct ArtContainer {
    #[serde(rename = "Metadata", default)]
    pub metadata: Vec<ArtworkEntry>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArtworkEntry {
    pub key: Option<String>,
    pub rating_key: Option<String>,
    pub thumb: Option<String>,
    pub provider: Option<String>,
    pub selected: Option<bool>,
}

// === plex.tv v2 ===

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SigninResponse {
    pub auth_token: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TvResource {
    #[serde(default)]
    pub name: String,
    pub product: Option<String>,
    #[serde(default)]
    pub provides: String,
    pub client_identifier: Option<String>,
    pub access_token: Option<String>,
    #[serde(default)]
    pub connections: Vec<TvConnection>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TvConnection {
    #[serde(default)]
    pub uri: String,
    pub local: Option<bool>,
    pub relay: Option<bool>,
}

/// `/api/v2/user` and `/api/v2/friends` rows.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TvUser {
    pub id: Option<i64>,
    pub uuid: Option<String>,
    pub username: Option<String>,
    pub title: Option<String>,
    pub email: Option<String>,
    pub home: Option<bool>,
    pub restricted: Option<bool>,
    pub status: Option<String>,
    pub subscription: Option<TvSubscription>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TvSubscription {
    pub active: Option<bool>,
    pub status: Option<String>,
    #[serde(default)]
    pub features: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_sections() {
        let body = r#"{
            "MediaContainer": {
                "size": 2,
                "Directory": [
                    {"key": "1", "type": "movie", "title": "Movies",
                     "agent": "tv.plex.agents.movie", "scanner": "Plex Movie",
                     "language": "en-US", "uuid": "abc",
                     "Location": [{"id": 1, "path": "/data/movies"}]},
                    {"key": "2", "type": "show", "title": "TV Shows"}
                ]
            }
        }"#;
        let parsed: MediaContainer<DirectoryContainer> = serde_json::from_str(body).unwrap();
        let dirs = parsed.media_container.directory;
        assert_eq!(dirs.len(), 2);
        assert_eq!(dirs[0].title, "Movies");
        assert_eq!(dirs[0].kind, "movie");
        assert_eq!(dirs[0].locations[0].path.as_deref(), Some("/data/movies"));
    }

    #[test]
    fn test_parse_items() {
        let body = r#"{
            "MediaContainer": {
                "size": 1,
                "totalSize": 42,
                "Metadata": [{
                    "ratingKey": "101", "key": "/library/metadata/101",
                    "type": "movie", "title": "Heat", "year": 1995,
                    "viewCount": 2, "duration": 10260000, "studio": "Warner Bros.",
                    "Genre": [{"tag": "Crime"}, {"tag": "Thriller"}],
                    "Director": [{"tag": "Michael Mann"}],
                    "Media": [{"bitrate": 12000, "videoResolution": "1080",
                               "videoCodec": "h264", "container": "mkv",
                               "Part": [{"id": 7, "file": "/data/movies/Heat.mkv"}]}]
                }]
            }
        }"#;
        let parsed: MediaContainer<ItemsContainer> = serde_json::from_str(body).unwrap();
        let container = parsed.media_container;
        assert_eq!(container.total_size, Some(42));
        let item = &container.metadata[0];
        assert_eq!(item.rating_key, "101");
        assert_eq!(item.year, Some(1995));
        assert_eq!(item.view_count, Some(2));
        assert_eq!(item.genres.len(), 2);
        assert_eq!(item.media[0].video_resolution.as_deref(), Some("1080"));
        assert_eq!(
            item.media[0].parts[0].file.as_deref(),
            Some("/data/movies/Heat.mkv")
        );
    }

    #[test]
    fn test_parse_session_with_player() {
        let body = r#"{
            "MediaContainer": {
                "size": 1,
                "Metadata": [{
                    "ratingKey": "55", "type": "episode", "title": "Pilot",
                    "grandparentTitle": "Some Show", "parentIndex": 1, "index": 1,
                    "viewOffset": 60000, "duration": 1800000,
                    "Player": {"title": "Living Room TV", "state": "playing",
                               "address": "10.0.0.5", "product": "Plex for Apple TV",
                               "machineIdentifier": "client-1"},
                    "User": {"id": 1, "title": "owner"},
                    "TranscodeSession": {"videoDecision": "transcode",
                                         "sourceVideoCodec": "hevc", "videoCodec": "h264"}
                }]
            }
        }"#;
        let parsed: MediaContainer<ItemsContainer> = serde_json::from_str(body).unwrap();
        let session = &parsed.media_container.metadata[0];
        let player = session.player.as_ref().unwrap();
        assert_eq!(player.title, "Living Room TV");
        assert_eq!(player.state.as_deref(), Some("playing"));
        let tc = session.transcode_session.as_ref().unwrap();
        assert_eq!(tc.source_video_codec.as_deref(), Some("hevc"));
    }

    #[test]
    fn test_parse_search_results() {
        let body = r#"{
            "MediaContainer": {
                "size": 2,
                "SearchResult": [
                    {"score": 0.95, "Metadata": {"ratingKey": "1", "type": "movie", "title": "Alien", "year": 1979}},
                    {"score": 0.5}
                ]
            }
        }"#;
        let parsed: MediaContainer<SearchContainer> = serde_json::from_str(body).unwrap();
        let results = parsed.media_container.search_result;
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].metadata.as_ref().unwrap().title, "Alien");
        assert!(results[1].metadata.is_none());
    }

    #[test]
    fn test_parse_butler_tasks() {
        let body = r#"{
            "ButlerTasks": {
                "ButlerTask": [
                    {"name": "BackupDatabase", "interval": 3,
                     "scheduleRandomized": false, "enabled": true,
                     "title": "Backup Database"},
                    {"name": "OptimizeDatabase", "enabled": false}
                ]
            }
        }"#;
        let parsed: ButlerTasksEnvelope = serde_json::from_str(body).unwrap();
        let tasks = parsed.butler_tasks.tasks;
        assert_eq!(tasks.len(), 2);
        assert_eq!(tasks[0].name, "BackupDatabase");
        assert_eq!(tasks[0].enabled, Some(true));
    }

    #[test]
    fn test_parse_history_row() {
        let body = r#"{
            "MediaContainer": {
                "size": 1,
                "Metadata": [{
                    "historyKey": "/status/sessions/history/9",
                    "ratingKey": "101", "title": "Heat", "type": "movie",
                    "accountID": 1, "deviceID": 12, "viewedAt": 1700000000
                }]
            }
        }"#;
        let parsed: MediaContainer<ItemsContainer> = serde_json::from_str(body).unwrap();
        let row = &parsed.media_container.metadata[0];
        assert_eq!(row.account_id, Some(1));
        assert_eq!(row.device_id, Some(12));
        assert_eq!(row.viewed_at, Some(1700000000));
    }

    #[test]
    fn test_parse_tv_resources() {
        let body = r#"[
            {"name": "office-pms", "product": "Plex Media Server",
             "provides": "server", "clientIdentifier": "pms-1",
             "accessToken": "tok",
             "connections": [
                {"uri": "https://1-2-3-4.plex.direct:32400", "local": false, "relay": false},
                {"uri": "http://192.168.1.10:32400", "local": true, "relay": false}
             ]},
            {"name": "phone", "provides": "client,player", "connections": []}
        ]"#;
        let resources: Vec<TvResource> = serde_json::from_str(body).unwrap();
        assert_eq!(resources.len(), 2);
        assert!(resources[0].provides.contains("server"));
        assert_eq!(resources[0].connections.len(), 2);
        assert_eq!(resources[0].access_token.as_deref(), Some("tok"));
    }
}
