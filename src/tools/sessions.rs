//! Session tools: live playback sessions and per-item history.

use std::collections::HashMap;

use rmcp::{model::CallToolResult, ErrorData as McpError};
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::plex::types::MediaItem;
use crate::plex::{PlexClient, PlexHandle};
use crate::shared;

use super::{connect, item_summary, locate_media};

// === Parameter Types ===

#[derive(Debug, Deserialize, JsonSchema)]
pub struct HistoryParams {
    #[schemars(description = "Title of the media item (ignored when media_id is given)")]
    pub media_title: Option<String>,
    #[schemars(description = "Rating key of the media item; bypasses title lookup")]
    pub media_id: Option<i64>,
    #[schemars(description = "Limit the title lookup to one library")]
    pub library_name: Option<String>,
}

// === Helper Functions ===

fn session_entry(index: usize, session: &MediaItem) -> Value {
    let mut entry = serde_json::Map::new();
    entry.insert("session_id".into(), (index + 1).into());
    entry.insert("media".into(), item_summary(session));

    if let Some(user) = &session.user {
        entry.insert(
            "user".into(),
            user.title.clone().unwrap_or_else(|| "Unknown".into()).into(),
        );
    }
    if let Some(player) = &session.player {
        entry.insert(
            "player".into(),
            json!({
                "name": player.title,
                "state": player.state,
                "ip": player.address,
                "platform": player.platform,
                "product": player.product,
                "device": player.device,
                "version": player.version,
            }),
        );
    }
    if let (Some(offset), Some(duration)) = (session.view_offset, session.duration) {
        if duration > 0 {
            let percent = (offset as f64 / duration as f64) * 100.0;
            let minutes_remaining = (duration - offset) / 60_000;
            entry.insert(
                "progress".into(),
                json!({
                    "percent": (percent * 10.0).round() / 10.0,
                    "minutes_remaining": minutes_remaining,
                }),
            );
        }
    }
    if let Some(media) = session.media.first() {
        entry.insert(
            "media_info".into(),
            json!({
                "bitrate_kbps": media.bitrate,
                "resolution": media.video_resolution,
            }),
        );
    }
    match &session.transcode_session {
        Some(tc) => {
            let mut info = serde_json::Map::new();
            info.insert("active".into(), true.into());
            if let (Some(from), Some(to)) = (&tc.source_video_codec, &tc.video_codec) {
                info.insert("video".into(), format!("{from} to {to}").into());
            }
            if let (Some(from), Some(to)) = (&tc.source_audio_codec, &tc.audio_codec) {
                info.insert("audio".into(), format!("{from} to {to}").into());
            }
            if let Some(speed) = tc.speed {
                info.insert("speed".into(), speed.into());
            }
            entry.insert("transcoding".into(), Value::Object(info));
        }
        None => {
            entry.insert(
                "transcoding".into(),
                json!({"active": false, "mode": "Direct Play/Stream"}),
            );
        }
    }
    Value::Object(entry)
}

/// Resolve history account ids to names: one batch fetch, indexed by id;
/// per-item fetch only when the batch endpoint fails.
async fn account_names(client: &PlexClient, rows: &[MediaItem]) -> HashMap<i64, String> {
    let mut names = HashMap::new();
    match client.accounts().await {
        Ok(accounts) => {
            for account in accounts {
                names.insert(account.id, account.name);
            }
        }
        Err(e) => {
            tracing::warn!("Batch account fetch failed, falling back to per-id: {e}");
            for id in rows.iter().filter_map(|r| r.account_id) {
                if names.contains_key(&id) {
                    continue;
                }
                if let Ok(Some(account)) = client.account(id).await {
                    names.insert(id, account.name);
                }
            }
        }
    }
    names
}

async fn device_names(client: &PlexClient, rows: &[MediaItem]) -> HashMap<i64, String> {
    let mut names = HashMap::new();
    match client.devices().await {
        Ok(devices) => {
            for device in devices {
                names.insert(device.id, device.name);
            }
        }
        Err(e) => {
            tracing::warn!("Batch device fetch failed, falling back to per-id: {e}");
            for id in rows.iter().filter_map(|r| r.device_id) {
                if names.contains_key(&id) {
                    continue;
                }
                if let Ok(Some(device)) = client.device(id).await {
                    names.insert(id, device.name);
                }
            }
        }
    }
    names
}

// === Tool Functions ===

pub async fn get_active(plex: &PlexHandle) -> Result<CallToolResult, McpError> {
    let client = match connect(plex).await {
        Ok(c) => c,
        Err(resp) => return resp,
    };
    let sessions = match client.sessions().await {
        Ok(sessions) => sessions,
        Err(e) => return shared::failure(format!("Error getting active sessions: {e}")),
    };
    if sessions.is_empty() {
        return shared::success(json!({
            "message": "No active sessions found",
            "sessions_count": 0,
            "sessions": [],
        }));
    }

    let transcode_count = sessions
        .iter()
        .filter(|s| s.transcode_session.is_some())
        .count();
    let total_bitrate: i64 = sessions
        .iter()
        .filter_map(|s| s.media.first().and_then(|m| m.bitrate))
        .sum();
    let listed: Vec<Value> = sessions
        .iter()
        .enumerate()
        .map(|(i, s)| session_entry(i, s))
        .collect();

    shared::success(json!({
        "sessions_count": listed.len(),
        "transcode_count": transcode_count,
        "direct_play_count": listed.len() - transcode_count,
        "total_bitrate_kbps": total_bitrate,
        "sessions": listed,
    }))
}

pub async fn get_history(
    plex: &PlexHandle,
    params: HistoryParams,
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

    let rows = match client.history_for_item(&item.rating_key).await {
        Ok(rows) => rows,
        Err(e) => return shared::failure(format!("Error getting playback history: {e}")),
    };
    if rows.is_empty() {
        return shared::success(json!({
            "media": item_summary(&item),
            "play_count": 0,
            "history": [],
            "message": format!("No one has watched '{}' yet", item.title),
        }));
    }

    let accounts = account_names(client, &rows).await;
    let devices = device_names(client, &rows).await;

    let history: Vec<Value> = rows
        .iter()
        .map(|row| {
            let user = row
                .account_id
                .map(|id| {
                    accounts
                        .get(&id)
                        .cloned()
                        .unwrap_or_else(|| format!("User ID: {id}"))
                })
                .unwrap_or_else(|| "Unknown User".into());
            let device = row
                .device_id
                .map(|id| {
                    devices
                        .get(&id)
                        .cloned()
                        .unwrap_or_else(|| format!("Device ID: {id}"))
                })
                .unwrap_or_else(|| "Unknown Device".into());
            json!({
                "user": user,
                "device": device,
                "viewed_at": row.viewed_at,
            })
        })
        .collect();

    shared::success(json!({
        "media": item_summary(&item),
        "play_count": history.len(),
        "history": history,
    }))
}
