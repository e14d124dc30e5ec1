//! Server tools: identity, statistics, butler maintenance tasks.

use std::collections::HashMap;

use rmcp::{model::CallToolResult, ErrorData as McpError};
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::plex::PlexHandle;
use crate::shared::{self, format_bytes};

use super::connect;

// === Parameter Types ===

#[derive(Debug, Deserialize, JsonSchema)]
pub struct BandwidthParams {
    #[schemars(description = "Sample granularity: seconds, hours, days, weeks or months")]
    pub timespan: Option<String>,
    #[schemars(description = "Only local (true) or remote (false) traffic")]
    pub lan: Option<bool>,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct ButlerTaskParams {
    #[schemars(description = "Butler task name, e.g. BackupDatabase, OptimizeDatabase, CleanOldBundles")]
    pub task_name: String,
}

// === Helper Functions ===

/// The statistics endpoint takes a numeric granularity code.
fn timespan_code(timespan: &str) -> Option<u8> {
    match timespan.to_lowercase().as_str() {
        "seconds" => Some(1),
        "hours" => Some(2),
        "days" => Some(3),
        "weeks" => Some(4),
        "months" => Some(6),
        _ => None,
    }
}

// === Tool Functions ===

pub async fn get_info(plex: &PlexHandle) -> Result<CallToolResult, McpError> {
    let client = match connect(plex).await {
        Ok(c) => c,
        Err(resp) => return resp,
    };
    let info = match client.server_info().await {
        Ok(info) => info,
        Err(e) => return shared::failure(format!("Error getting server info: {e}")),
    };
    shared::success(json!({
        "server_name": info.friendly_name,
        "machine_identifier": info.machine_identifier,
        "version": info.version,
        "platform": info.platform,
        "platform_version": info.platform_version,
        "updated_at": info.updated_at,
        "my_plex_username": info.my_plex_username,
        "my_plex_mapping_state": info.my_plex_mapping_state,
        "transcoder_active_video_sessions": info.transcoder_active_video_sessions,
        "transcoder_audio": info.transcoder_audio,
        "transcoder_video": info.transcoder_video,
        "transcoder_video_bitrates": info.transcoder_video_bitrates,
        "transcoder_video_qualities": info.transcoder_video_qualities,
        "transcoder_video_resolutions": info.transcoder_video_resolutions,
        "streaming_brain_version": info.streaming_brain_version,
        "owner_features": info.owner_features,
    }))
}

pub async fn get_bandwidth(
    plex: &PlexHandle,
    params: BandwidthParams,
) -> Result<CallToolResult, McpError> {
    let code = match &params.timespan {
        Some(timespan) => match timespan_code(timespan) {
            Some(code) => Some(code),
            None => {
                return shared::failure(format!(
                    "Invalid timespan '{timespan}'. Valid values: seconds, hours, days, weeks, months"
                ))
            }
        },
        None => None,
    };
    let client = match connect(plex).await {
        Ok(c) => c,
        Err(resp) => return resp,
    };
    let stats = match client.bandwidth(code, params.lan).await {
        Ok(stats) => stats,
        Err(e) => return shared::failure(format!("Error getting bandwidth statistics: {e}")),
    };

    // The container ships its own account/device dimension tables; join
    // the samples against them.
    let accounts: HashMap<i64, String> = stats
        .accounts
        .iter()
        .map(|a| (a.id, a.name.clone()))
        .collect();
    let devices: HashMap<i64, &crate::plex::types::DeviceEntry> =
        stats.devices.iter().map(|d| (d.id, d)).collect();

    let samples: Vec<Value> = stats
        .bandwidth
        .iter()
        .map(|sample| {
            let device = sample.device_id.and_then(|id| devices.get(&id));
            json!({
                "account": sample.account_id.and_then(|id| accounts.get(&id)),
                "device_id": sample.device_id,
                "device_name": device.map(|d| d.name.clone()),
                "platform": device.and_then(|d| d.platform.clone()),
                "client_identifier": device.and_then(|d| d.client_identifier.clone()),
                "at": sample.at,
                "bytes": sample.bytes,
                "bytes_human": sample.bytes.map(|b| format_bytes(b.max(0) as u64)),
                "is_local": sample.lan,
                "timespan_seconds": sample.timespan,
            })
        })
        .collect();

    shared::success(json!({"count": samples.len(), "bandwidth": samples}))
}

pub async fn get_resources(plex: &PlexHandle) -> Result<CallToolResult, McpError> {
    let client = match connect(plex).await {
        Ok(c) => c,
        Err(resp) => return resp,
    };
    let samples = match client.resource_stats().await {
        Ok(samples) => samples,
        Err(e) => return shared::failure(format!("Error getting resource statistics: {e}")),
    };
    let listed: Vec<Value> = samples
        .iter()
        .map(|s| {
            json!({
                "timestamp": s.at,
                "timespan": s.timespan,
                "host_cpu_utilization": s.host_cpu_utilization,
                "host_memory_utilization": s.host_memory_utilization,
                "process_cpu_utilization": s.process_cpu_utilization,
                "process_memory_utilization": s.process_memory_utilization,
            })
        })
        .collect();
    shared::success(json!({"count": listed.len(), "resources": listed}))
}

pub async fn list_butler_tasks(plex: &PlexHandle) -> Result<CallToolResult, McpError> {
    let client = match connect(plex).await {
        Ok(c) => c,
        Err(resp) => return resp,
    };
    let tasks = match client.butler_tasks().await {
        Ok(tasks) => tasks,
        Err(e) => return shared::failure(format!("Error getting butler tasks: {e}")),
    };
    let listed: Vec<Value> = tasks
        .iter()
        .map(|t| {
            json!({
                "name": t.name,
                "title": t.title,
                "description": t.description,
                "enabled": t.enabled,
                "interval": t.interval,
                "schedule_randomized": t.schedule_randomized,
            })
        })
        .collect();
    shared::success(json!({"count": listed.len(), "tasks": listed}))
}

pub async fn run_butler_task(
    plex: &PlexHandle,
    params: ButlerTaskParams,
) -> Result<CallToolResult, McpError> {
    if params.task_name.trim().is_empty() {
        return shared::failure("task_name must not be empty");
    }
    let client = match connect(plex).await {
        Ok(c) => c,
        Err(resp) => return resp,
    };
    if let Err(e) = client.run_butler_task(&params.task_name).await {
        return shared::failure(format!("Failed to run butler task: {e}"));
    }
    shared::success(json!({
        "message": format!("Butler task '{}' started successfully", params.task_name)
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timespan_codes() {
        assert_eq!(timespan_code("seconds"), Some(1));
        assert_eq!(timespan_code("Hours"), Some(2));
        assert_eq!(timespan_code("days"), Some(3));
        assert_eq!(timespan_code("weeks"), Some(4));
        assert_eq!(timespan_code("months"), Some(6));
        assert_eq!(timespan_code("fortnights"), None);
    }
}
