//! Controllable client tools: discovery, timelines, playback control.
//!
//! Commands go through the server proxy (`/player/...` with the target
//! client addressed by machine identifier), so only the server connection
//! is ever held.

use rmcp::{model::CallToolResult, ErrorData as McpError};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::plex::types::{ClientEntry, MediaItem, Player};
use crate::plex::{PlexClient, PlexHandle};
use crate::shared;
use crate::shared::resolve::MatchStub;

use super::{connect, item_summary, locate_media, ToolStep};

// === Parameter Types ===

#[derive(Debug, Deserialize, JsonSchema)]
pub struct ListParams {
    #[schemars(description = "Include full client details (default: true)")]
    pub include_details: Option<bool>,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct NameParams {
    #[schemars(description = "Client name (case-insensitive, partial match allowed)")]
    pub client_name: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct StartPlaybackParams {
    #[schemars(description = "Title of the media to play (ignored when media_id is given)")]
    pub media_title: Option<String>,
    #[schemars(description = "Rating key of the media to play; bypasses title lookup")]
    pub media_id: Option<i64>,
    #[schemars(description = "Client to play on; omit to list available clients")]
    pub client_name: Option<String>,
    #[schemars(description = "Start offset in milliseconds (default: 0)")]
    pub offset: Option<i64>,
    #[schemars(description = "Limit the title lookup to one library")]
    pub library_name: Option<String>,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct ControlParams {
    #[schemars(description = "Client name (case-insensitive, partial match allowed)")]
    pub client_name: String,
    #[schemars(
        description = "Action: play, pause, stop, skipNext, skipPrevious, stepForward, stepBack, seekTo, seekForward, seekBack, mute, unmute, setVolume"
    )]
    pub action: String,
    #[schemars(description = "Parameter for seekTo (ms), seekForward/seekBack (s) or setVolume (0-100)")]
    pub parameter: Option<i64>,
    #[schemars(description = "Controlled media type: video, music or photo (default: video)")]
    pub media_type: Option<String>,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct NavigateParams {
    #[schemars(description = "Client name (case-insensitive, partial match allowed)")]
    pub client_name: String,
    #[schemars(
        description = "Action: moveUp, moveDown, moveLeft, moveRight, select, back, home, contextMenu"
    )]
    pub action: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct SetStreamsParams {
    #[schemars(description = "Client name (case-insensitive, partial match allowed)")]
    pub client_name: String,
    #[schemars(description = "Audio stream id to switch to")]
    pub audio_stream_id: Option<String>,
    #[schemars(description = "Subtitle stream id to switch to ('0' disables subtitles)")]
    pub subtitle_stream_id: Option<String>,
    #[schemars(description = "Video stream id to switch to")]
    pub video_stream_id: Option<String>,
}

// === Client Roster ===

/// One controllable client, merged from `/clients` and live session
/// players.
#[derive(Debug, Clone, Serialize)]
pub struct ClientInfo {
    pub name: String,
    pub machine_identifier: String,
    pub product: Option<String>,
    pub device: Option<String>,
    pub platform: Option<String>,
    pub state: Option<String>,
    pub version: Option<String>,
    pub address: Option<String>,
    pub protocol_capabilities: Vec<String>,
    pub source: &'static str,
}

impl ClientInfo {
    fn from_entry(entry: &ClientEntry) -> Option<Self> {
        Some(Self {
            name: entry.name.clone(),
            machine_identifier: entry.machine_identifier.clone()?,
            product: entry.product.clone(),
            device: entry.device_class.clone(),
            platform: None,
            state: None,
            version: entry.version.clone(),
            address: entry.address.clone(),
            protocol_capabilities: entry
                .protocol_capabilities
                .as_deref()
                .map(|caps| caps.split(',').map(|c| c.trim().to_string()).collect())
                .unwrap_or_default(),
            source: "client",
        })
    }

    fn from_player(player: &Player) -> Option<Self> {
        Some(Self {
            name: player.title.clone(),
            machine_identifier: player.machine_identifier.clone()?,
            product: player.product.clone(),
            device: player.device.clone(),
            platform: player.platform.clone(),
            state: player.state.clone(),
            version: player.version.clone(),
            address: player.address.clone(),
            protocol_capabilities: Vec::new(),
            source: "session",
        })
    }

    /// Unknown capabilities (session-only clients) are not treated as
    /// missing ones.
    fn supports(&self, capability: &str) -> bool {
        self.protocol_capabilities.is_empty()
            || self.protocol_capabilities.iter().any(|c| c == capability)
    }
}

/// Merge both sources, deduplicating by machine identifier; `/clients`
/// entries win.
fn merge_clients(entries: &[ClientEntry], sessions: &[MediaItem]) -> Vec<ClientInfo> {
    let mut merged: Vec<ClientInfo> = entries.iter().filter_map(ClientInfo::from_entry).collect();
    for session in sessions {
        if let Some(info) = session.player.as_ref().and_then(ClientInfo::from_player) {
            if !merged
                .iter()
                .any(|c| c.machine_identifier == info.machine_identifier)
            {
                merged.push(info);
            }
        }
    }
    merged
}

enum ClientResolution {
    One(Box<ClientInfo>),
    NotFound,
    Ambiguous(Vec<MatchStub>),
}

/// Exact name match short-circuits; otherwise substring candidates follow
/// the usual three-way outcome.
fn resolve_client(mut clients: Vec<ClientInfo>, name: &str) -> ClientResolution {
    let wanted = name.to_lowercase();
    clients.retain(|c| c.name.to_lowercase().contains(&wanted));
    if clients.is_empty() {
        return ClientResolution::NotFound;
    }
    let exact: Vec<usize> = clients
        .iter()
        .enumerate()
        .filter(|(_, c)| c.name.to_lowercase() == wanted)
        .map(|(i, _)| i)
        .collect();
    if let [index] = exact.as_slice() {
        return ClientResolution::One(Box::new(clients.swap_remove(*index)));
    }
    if clients.len() == 1 {
        return ClientResolution::One(Box::new(clients.remove(0)));
    }
    ClientResolution::Ambiguous(
        clients
            .iter()
            .map(|c| MatchStub {
                title: c.name.clone(),
                id: c.machine_identifier.clone(),
                kind: "client".to_string(),
                year: None,
            })
            .collect(),
    )
}

async fn roster(client: &PlexClient) -> ToolStep<Vec<ClientInfo>> {
    let entries = match client.clients().await {
        Ok(entries) => entries,
        Err(e) => return Err(shared::failure(format!("Error listing clients: {e}"))),
    };
    let sessions = client.sessions().await.unwrap_or_default();
    Ok(merge_clients(&entries, &sessions))
}

async fn find_client(client: &PlexClient, name: &str) -> ToolStep<ClientInfo> {
    let clients = roster(client).await?;
    match resolve_client(clients, name) {
        ClientResolution::One(info) => Ok(*info),
        ClientResolution::NotFound => {
            Err(shared::failure(format!("No client found matching '{name}'")))
        }
        ClientResolution::Ambiguous(matches) => Err(shared::disambiguation(
            format!("Multiple clients matched '{name}'"),
            &matches,
        )),
    }
}

// === Action Tables ===

const CONTROL_ACTIONS: [&str; 13] = [
    "play",
    "pause",
    "stop",
    "skipNext",
    "skipPrevious",
    "stepForward",
    "stepBack",
    "seekTo",
    "seekForward",
    "seekBack",
    "mute",
    "unmute",
    "setVolume",
];

/// Direct action -> endpoint + params. Relative seeks need the current
/// timeline position and are composed in the tool body.
fn control_request(
    action: &str,
    parameter: Option<i64>,
    media_type: &str,
) -> Option<(String, Vec<(String, String)>)> {
    let kind = ("type".to_string(), media_type.to_string());
    match action {
        "play" | "pause" | "stop" | "skipNext" | "skipPrevious" | "stepForward" | "stepBack" => {
            Some((format!("/player/playback/{action}"), vec![kind]))
        }
        "seekTo" => parameter.map(|offset| {
            (
                "/player/playback/seekTo".to_string(),
                vec![kind, ("offset".to_string(), offset.to_string())],
            )
        }),
        "mute" => Some((
            "/player/playback/setParameters".to_string(),
            vec![kind, ("mute".to_string(), "1".to_string())],
        )),
        "unmute" => Some((
            "/player/playback/setParameters".to_string(),
            vec![kind, ("mute".to_string(), "0".to_string())],
        )),
        "setVolume" => parameter.map(|volume| {
            (
                "/player/playback/setParameters".to_string(),
                vec![kind, ("volume".to_string(), volume.to_string())],
            )
        }),
        _ => None,
    }
}

const NAVIGATION_ACTIONS: [&str; 8] = [
    "moveUp",
    "moveDown",
    "moveLeft",
    "moveRight",
    "select",
    "back",
    "home",
    "contextMenu",
];

fn queue_type(kind: &str) -> &'static str {
    match kind {
        "track" | "album" | "artist" => "audio",
        "photo" => "photo",
        _ => "video",
    }
}

fn timeline_value(entry: &crate::plex::types::TimelineEntry) -> Value {
    json!({
        "type": entry.kind,
        "state": entry.state,
        "time": entry.time,
        "duration": entry.duration,
        "rating_key": entry.rating_key,
        "volume": entry.volume,
        "muted": entry.muted.map(|m| m != 0),
        "shuffled": entry.shuffled.map(|s| s != 0),
        "repeat": entry.repeat_mode,
    })
}

/// The poll returns one timeline per controller type; the active one (if
/// any) carries a non-stopped state.
fn active_timeline(
    timelines: &[crate::plex::types::TimelineEntry],
) -> Option<&crate::plex::types::TimelineEntry> {
    timelines
        .iter()
        .find(|t| t.state.as_deref().is_some_and(|s| s != "stopped"))
}

// === Tool Functions ===

pub async fn list(plex: &PlexHandle, params: ListParams) -> Result<CallToolResult, McpError> {
    let client = match connect(plex).await {
        Ok(c) => c,
        Err(resp) => return resp,
    };
    let clients = match roster(client).await {
        Ok(clients) => clients,
        Err(resp) => return resp,
    };
    if clients.is_empty() {
        return shared::success(json!({
            "message": "No clients currently connected",
            "count": 0,
            "clients": [],
        }));
    }

    let count = clients.len();
    let listed: Value = if params.include_details.unwrap_or(true) {
        json!(clients)
    } else {
        json!(clients.iter().map(|c| c.name.clone()).collect::<Vec<_>>())
    };
    shared::success(json!({"count": count, "clients": listed}))
}

pub async fn get_details(plex: &PlexHandle, params: NameParams) -> Result<CallToolResult, McpError> {
    let client = match connect(plex).await {
        Ok(c) => c,
        Err(resp) => return resp,
    };
    match find_client(client, &params.client_name).await {
        Ok(info) => shared::success(json!(info)),
        Err(resp) => resp,
    }
}

pub async fn get_active(plex: &PlexHandle) -> Result<CallToolResult, McpError> {
    let client = match connect(plex).await {
        Ok(c) => c,
        Err(resp) => return resp,
    };
    let sessions = match client.sessions().await {
        Ok(sessions) => sessions,
        Err(e) => return shared::failure(format!("Error getting active clients: {e}")),
    };
    if sessions.is_empty() {
        return shared::success(json!({
            "message": "No active playback sessions found",
            "count": 0,
            "active_clients": [],
        }));
    }

    let active: Vec<Value> = sessions
        .iter()
        .filter_map(|session| {
            let player = session.player.as_ref()?;
            let progress = match (session.view_offset, session.duration) {
                (Some(offset), Some(duration)) if duration > 0 => {
                    Some(((offset as f64 / duration as f64) * 1000.0).round() / 10.0)
                }
                _ => None,
            };
            Some(json!({
                "name": player.title,
                "device": player.device,
                "product": player.product,
                "platform": player.platform,
                "state": player.state,
                "user": session.user.as_ref().and_then(|u| u.title.clone()),
                "media": item_summary(session),
                "progress_percent": progress,
                "transcoding": session.transcode_session.is_some(),
            }))
        })
        .collect();

    shared::success(json!({"count": active.len(), "active_clients": active}))
}

pub async fn get_timeline(plex: &PlexHandle, params: NameParams) -> Result<CallToolResult, McpError> {
    let client = match connect(plex).await {
        Ok(c) => c,
        Err(resp) => return resp,
    };
    let info = match find_client(client, &params.client_name).await {
        Ok(info) => info,
        Err(resp) => return resp,
    };

    match client.poll_timeline(&info.machine_identifier).await {
        Ok(timelines) => match active_timeline(&timelines) {
            Some(timeline) => shared::success(json!({
                "client_name": info.name,
                "source": "timeline",
                "timeline": timeline_value(timeline),
            })),
            None => shared::success(json!({
                "client_name": info.name,
                "message": format!("Client '{}' is not currently playing any media", info.name),
            })),
        },
        Err(e) => {
            // Not every client answers timeline polls; fall back to its
            // live session if one exists.
            tracing::debug!("Timeline poll for '{}' failed: {e}", info.name);
            let sessions = client.sessions().await.unwrap_or_default();
            let session = sessions.iter().find(|s| {
                s.player
                    .as_ref()
                    .and_then(|p| p.machine_identifier.as_deref())
                    == Some(info.machine_identifier.as_str())
            });
            match session {
                Some(session) => shared::success(json!({
                    "client_name": info.name,
                    "source": "session",
                    "timeline": {
                        "state": session.player.as_ref().and_then(|p| p.state.clone()),
                        "time": session.view_offset,
                        "duration": session.duration,
                        "media": item_summary(session),
                    },
                })),
                None => shared::failure(format!(
                    "Unable to get timeline information for client '{}'",
                    info.name
                )),
            }
        }
    }
}

pub async fn start_playback(
    plex: &PlexHandle,
    params: StartPlaybackParams,
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

    let Some(client_name) = &params.client_name else {
        let clients = match roster(client).await {
            Ok(clients) => clients,
            Err(resp) => return resp,
        };
        if clients.is_empty() {
            return shared::failure("No clients are currently connected to the Plex server");
        }
        let available: Vec<Value> = clients
            .iter()
            .map(|c| json!({"name": c.name, "device": c.device, "product": c.product}))
            .collect();
        return shared::success(json!({
            "message": "Specify a client to play on using the client_name parameter",
            "available_clients": available,
        }));
    };

    let info = match find_client(client, client_name).await {
        Ok(info) => info,
        Err(resp) => return resp,
    };
    if !info.supports("playback") {
        return shared::failure(format!(
            "Client '{}' does not support playback control",
            info.name
        ));
    }

    let queue = match client
        .create_play_queue(&item.rating_key, queue_type(&item.kind))
        .await
    {
        Ok(Some(id)) => id,
        Ok(None) => return shared::failure("Server did not return a play queue id"),
        Err(e) => return shared::failure(format!("Error creating play queue: {e}")),
    };

    let offset = params.offset.unwrap_or(0);
    let play_params = vec![
        ("key".to_string(), format!("/library/metadata/{}", item.rating_key)),
        ("offset".to_string(), offset.to_string()),
        (
            "machineIdentifier".to_string(),
            client.machine_identifier().to_string(),
        ),
        (
            "containerKey".to_string(),
            format!("/playQueues/{queue}?window=100&own=1"),
        ),
    ];
    if let Err(e) = client
        .player_command(&info.machine_identifier, "/player/playback/playMedia", &play_params)
        .await
    {
        return shared::failure(format!("Error starting playback: {e}"));
    }

    shared::success(json!({
        "message": format!("Started playback of '{}' on {}", item.title, info.name),
        "media": item_summary(&item),
        "client": info.name,
        "offset": offset,
    }))
}

pub async fn control_playback(
    plex: &PlexHandle,
    params: ControlParams,
) -> Result<CallToolResult, McpError> {
    let action = params.action.as_str();
    if !CONTROL_ACTIONS.contains(&action) {
        return shared::failure(format!(
            "Invalid action '{action}'. Valid actions are: {}",
            CONTROL_ACTIONS.join(", ")
        ));
    }
    let media_type = params.media_type.as_deref().unwrap_or("video");
    if !["video", "music", "photo"].contains(&media_type) {
        return shared::failure(format!(
            "Invalid media type '{media_type}'. Valid types are: video, music, photo"
        ));
    }
    if ["seekTo", "setVolume"].contains(&action) && params.parameter.is_none() {
        return shared::failure(format!("Action '{action}' requires a parameter value"));
    }
    if action == "setVolume" {
        if let Some(volume) = params.parameter {
            if !(0..=100).contains(&volume) {
                return shared::failure("Volume must be between 0 and 100");
            }
        }
    }

    let client = match connect(plex).await {
        Ok(c) => c,
        Err(resp) => return resp,
    };
    let info = match find_client(client, &params.client_name).await {
        Ok(info) => info,
        Err(resp) => return resp,
    };
    if !info.supports("playback") {
        return shared::failure(format!(
            "Client '{}' does not support playback control",
            info.name
        ));
    }

    let request = match action {
        "seekForward" | "seekBack" => {
            // Relative seeks are composed from the current position.
            let timelines = match client.poll_timeline(&info.machine_identifier).await {
                Ok(timelines) => timelines,
                Err(e) => {
                    return shared::failure(format!(
                        "Cannot seek: timeline unavailable for '{}': {e}",
                        info.name
                    ))
                }
            };
            let Some(current) = active_timeline(&timelines).and_then(|t| t.time) else {
                return shared::failure(format!(
                    "Cannot seek: client '{}' is not playing anything",
                    info.name
                ));
            };
            let delta_ms = params.parameter.unwrap_or(30) * 1000;
            let target = if action == "seekForward" {
                current + delta_ms
            } else {
                (current - delta_ms).max(0)
            };
            control_request("seekTo", Some(target), media_type)
        }
        _ => control_request(action, params.parameter, media_type),
    };
    let Some((path, query)) = request else {
        return shared::failure(format!("Action '{action}' requires a parameter value"));
    };

    if let Err(e) = client
        .player_command(&info.machine_identifier, &path, &query)
        .await
    {
        return shared::failure(format!("Error controlling playback: {e}"));
    }

    let timeline = client
        .poll_timeline(&info.machine_identifier)
        .await
        .ok()
        .as_deref()
        .and_then(active_timeline)
        .map(timeline_value);
    shared::success(json!({
        "message": format!("Performed '{action}' on client '{}'", info.name),
        "action": action,
        "client": info.name,
        "parameter": params.parameter,
        "timeline": timeline,
    }))
}

pub async fn navigate(plex: &PlexHandle, params: NavigateParams) -> Result<CallToolResult, McpError> {
    let action = params.action.as_str();
    if !NAVIGATION_ACTIONS.contains(&action) {
        return shared::failure(format!(
            "Invalid navigation action '{action}'. Valid actions are: {}",
            NAVIGATION_ACTIONS.join(", ")
        ));
    }
    let client = match connect(plex).await {
        Ok(c) => c,
        Err(resp) => return resp,
    };
    let info = match find_client(client, &params.client_name).await {
        Ok(info) => info,
        Err(resp) => return resp,
    };
    if !info.supports("navigation") {
        return shared::failure(format!(
            "Client '{}' does not support navigation control",
            info.name
        ));
    }

    let path = format!("/player/navigation/{action}");
    if let Err(e) = client
        .player_command(&info.machine_identifier, &path, &[])
        .await
    {
        return shared::failure(format!("Error navigating client: {e}"));
    }
    shared::success(json!({
        "message": format!("Performed navigation '{action}' on client '{}'", info.name),
        "action": action,
        "client": info.name,
    }))
}

pub async fn set_streams(
    plex: &PlexHandle,
    params: SetStreamsParams,
) -> Result<CallToolResult, McpError> {
    if params.audio_stream_id.is_none()
        && params.subtitle_stream_id.is_none()
        && params.video_stream_id.is_none()
    {
        return shared::failure(
            "At least one stream id (audio, subtitle or video) must be provided",
        );
    }
    let client = match connect(plex).await {
        Ok(c) => c,
        Err(resp) => return resp,
    };
    let info = match find_client(client, &params.client_name).await {
        Ok(info) => info,
        Err(resp) => return resp,
    };

    let mut query = vec![("type".to_string(), "video".to_string())];
    let mut changed = Vec::new();
    if let Some(id) = &params.audio_stream_id {
        query.push(("audioStreamID".to_string(), id.clone()));
        changed.push(format!("audio to {id}"));
    }
    if let Some(id) = &params.subtitle_stream_id {
        query.push(("subtitleStreamID".to_string(), id.clone()));
        changed.push(format!("subtitle to {id}"));
    }
    if let Some(id) = &params.video_stream_id {
        query.push(("videoStreamID".to_string(), id.clone()));
        changed.push(format!("video to {id}"));
    }

    if let Err(e) = client
        .player_command(&info.machine_identifier, "/player/playback/setStreams", &query)
        .await
    {
        return shared::failure(format!("Error setting streams: {e}"));
    }
    shared::success(json!({
        "message": format!("Set streams for '{}': {}", info.name, changed.join(", ")),
        "client": info.name,
        "changes": {
            "audio_stream": params.audio_stream_id,
            "subtitle_stream": params.subtitle_stream_id,
            "video_stream": params.video_stream_id,
        },
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(name: &str, machine: &str) -> ClientEntry {
        ClientEntry {
            name: name.into(),
            machine_identifier: Some(machine.into()),
            protocol_capabilities: Some("timeline,playback,navigation".into()),
            ..Default::default()
        }
    }

    fn session_with_player(name: &str, machine: &str) -> MediaItem {
        MediaItem {
            player: Some(Player {
                title: name.into(),
                machine_identifier: Some(machine.into()),
                state: Some("playing".into()),
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    #[test]
    fn test_merge_dedupes_by_machine_identifier() {
        let entries = vec![entry("Living Room", "m1")];
        let sessions = vec![
            session_with_player("Living Room", "m1"),
            session_with_player("Bedroom", "m2"),
        ];
        let merged = merge_clients(&entries, &sessions);
        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].source, "client");
        assert_eq!(merged[1].name, "Bedroom");
        assert_eq!(merged[1].source, "session");
    }

    #[test]
    fn test_resolve_client_exact_beats_substring() {
        let clients = merge_clients(
            &[entry("TV", "m1"), entry("TV Upstairs", "m2")],
            &[],
        );
        match resolve_client(clients, "tv") {
            ClientResolution::One(info) => assert_eq!(info.machine_identifier, "m1"),
            _ => panic!("expected exact match to win"),
        }
    }

    #[test]
    fn test_resolve_client_ambiguous_lists_all() {
        let clients = merge_clients(
            &[entry("TV Upstairs", "m1"), entry("TV Downstairs", "m2")],
            &[],
        );
        match resolve_client(clients, "tv") {
            ClientResolution::Ambiguous(matches) => {
                assert_eq!(matches.len(), 2);
                assert_eq!(matches[0].kind, "client");
            }
            _ => panic!("expected ambiguity"),
        }
    }

    #[test]
    fn test_resolve_client_not_found() {
        let clients = merge_clients(&[entry("TV", "m1")], &[]);
        assert!(matches!(
            resolve_client(clients, "projector"),
            ClientResolution::NotFound
        ));
    }

    #[test]
    fn test_control_request_mapping() {
        let (path, query) = control_request("pause", None, "video").unwrap();
        assert_eq!(path, "/player/playback/pause");
        assert_eq!(query, vec![("type".to_string(), "video".to_string())]);

        let (path, query) = control_request("setVolume", Some(40), "music").unwrap();
        assert_eq!(path, "/player/playback/setParameters");
        assert!(query.contains(&("volume".to_string(), "40".to_string())));

        assert!(control_request("seekTo", None, "video").is_none());
        assert!(control_request("rewind", Some(1), "video").is_none());
    }

    #[test]
    fn test_queue_type_by_media_kind() {
        assert_eq!(queue_type("track"), "audio");
        assert_eq!(queue_type("photo"), "photo");
        assert_eq!(queue_type("movie"), "video");
        assert_eq!(queue_type("episode"), "video");
    }
}
