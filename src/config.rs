//! Configuration: Plex connection settings, OAuth toggles for remote
//! mode, and runtime tool filtering.
//!
//! Precedence is CLI flags > environment variables > config file
//! (~/.config/rmcp-plex/config.toml). The file is optional; a server URL
//! and token from the environment are enough.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Plex server URL, e.g. http://192.168.1.10:32400
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Plex auth token (direct connection).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    /// Account credentials + server name, used when no url/token is set.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub server_name: Option<String>,
    #[serde(default)]
    pub oauth: OAuthSettings,
    /// List of disabled tool names (all others are enabled).
    #[serde(default)]
    pub disabled: Vec<String>,
}

/// OAuth settings for the SSE/HTTP transport. When enabled, the two
/// discovery documents are served next to the MCP routes; token
/// validation itself belongs to the external authorization server.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OAuthSettings {
    #[serde(default)]
    pub enabled: bool,
    /// External authorization server, e.g. https://auth.example.com
    #[serde(skip_serializing_if = "Option::is_none")]
    pub issuer: Option<String>,
    /// Public URL this server is reachable at (the protected resource).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub public_url: Option<String>,
}

impl Config {
    /// Get the config file path
    pub fn path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("rmcp-plex").join("config.toml"))
    }

    /// Load config from file (if any), then apply environment overrides.
    pub fn load() -> Self {
        let mut config = Self::load_file();
        config.apply_env(std::env::vars());
        config
    }

    fn load_file() -> Self {
        let Some(path) = Self::path() else {
            tracing::warn!("Could not determine config directory, using defaults");
            return Self::default();
        };

        if !path.exists() {
            tracing::info!("No config file found at {:?}, using environment only", path);
            return Self::default();
        }

        match fs::read_to_string(&path) {
            Ok(contents) => match toml::from_str(&contents) {
                Ok(config) => {
                    tracing::info!("Loaded config from {:?}", path);
                    config
                }
                Err(e) => {
                    tracing::error!("Failed to parse config file: {}", e);
                    Self::default()
                }
            },
            Err(e) => {
                tracing::error!("Failed to read config file: {}", e);
                Self::default()
            }
        }
    }

    /// Environment overrides, separated from `std::env` for testability.
    pub fn apply_env(&mut self, vars: impl Iterator<Item = (String, String)>) {
        for (key, value) in vars {
            if value.is_empty() {
                continue;
            }
            match key.as_str() {
                "PLEX_URL" => self.url = Some(value),
                "PLEX_TOKEN" => self.token = Some(value),
                "PLEX_USERNAME" => self.username = Some(value),
                "PLEX_PASSWORD" => self.password = Some(value),
                "PLEX_SERVER_NAME" => self.server_name = Some(value),
                "MCP_OAUTH_ENABLED" => self.oauth.enabled = value.eq_ignore_ascii_case("true"),
                "MCP_OAUTH_ISSUER" => self.oauth.issuer = Some(value),
                "MCP_SERVER_URL" => self.oauth.public_url = Some(value),
                _ => {}
            }
        }
    }

    /// Save config to file
    pub fn save(&self) -> anyhow::Result<()> {
        let path =
            Self::path().ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)?;
        fs::write(&path, contents)?;
        tracing::info!("Saved config to {:?}", path);
        Ok(())
    }

    /// Check if a tool is enabled
    pub fn is_enabled(&self, tool_name: &str) -> bool {
        !self.disabled.contains(&tool_name.to_string())
    }

    /// Enable a tool (remove from disabled list)
    pub fn enable(&mut self, tool_name: &str) {
        self.disabled.retain(|t| t != tool_name);
    }

    /// Disable a tool (add to disabled list)
    pub fn disable(&mut self, tool_name: &str) {
        if !self.disabled.contains(&tool_name.to_string()) {
            self.disabled.push(tool_name.to_string());
        }
    }
}

/// Get list of all available tool names (compile-time known)
pub fn all_tool_names() -> Vec<&'static str> {
    vec![
        // library
        "library_list",
        "library_get_stats",
        "library_get_details",
        "library_refresh",
        "library_scan",
        "library_get_recently_added",
        "library_get_contents",
        // media
        "media_search",
        "media_get_details",
        "media_edit_metadata",
        "media_delete",
        "media_list_artwork",
        "media_set_artwork",
        "media_get_artwork",
        // playlist
        "playlist_list",
        "playlist_get_contents",
        "playlist_create",
        "playlist_add_items",
        "playlist_remove_items",
        "playlist_delete",
        // collection
        "collection_list",
        "collection_get_contents",
        "collection_create",
        "collection_add_items",
        "collection_remove_items",
        "collection_delete",
        "collection_edit",
        // user
        "user_search",
        "user_get_info",
        "user_get_on_deck",
        "user_get_watch_history",
        // sessions
        "sessions_get_active",
        "sessions_get_history",
        // server
        "server_get_info",
        "server_get_bandwidth",
        "server_get_resources",
        "server_list_butler_tasks",
        "server_run_butler_task",
        // client
        "client_list",
        "client_get_details",
        "client_get_active",
        "client_get_timeline",
        "client_start_playback",
        "client_control_playback",
        "client_navigate",
        "client_set_streams",
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert!(config.disabled.is_empty());
        assert!(config.url.is_none());
        assert!(!config.oauth.enabled);
        assert!(config.is_enabled("library_list"));
    }

    #[test]
    fn test_enable_disable() {
        let mut config = Config::default();

        config.disable("media_delete");
        assert!(!config.is_enabled("media_delete"));
        assert!(config.is_enabled("library_list"));

        config.enable("media_delete");
        assert!(config.is_enabled("media_delete"));
    }

    #[test]
    fn test_env_overrides_file_values() {
        let mut config = Config {
            url: Some("http://old:32400".into()),
            token: Some("file-token".into()),
            ..Default::default()
        };
        let vars = vec![
            ("PLEX_URL".to_string(), "http://new:32400".to_string()),
            ("MCP_OAUTH_ENABLED".to_string(), "true".to_string()),
            (
                "MCP_OAUTH_ISSUER".to_string(),
                "https://auth.local".to_string(),
            ),
            ("UNRELATED".to_string(), "x".to_string()),
        ];
        config.apply_env(vars.into_iter());
        assert_eq!(config.url.as_deref(), Some("http://new:32400"));
        // untouched by env
        assert_eq!(config.token.as_deref(), Some("file-token"));
        assert!(config.oauth.enabled);
        assert_eq!(config.oauth.issuer.as_deref(), Some("https://auth.local"));
    }

    #[test]
    fn test_empty_env_values_are_ignored() {
        let mut config = Config::default();
        config.apply_env(vec![("PLEX_URL".to_string(), String::new())].into_iter());
        assert!(config.url.is_none());
    }

    #[test]
    fn test_all_tool_names_unique() {
        let names = all_tool_names();
        let mut deduped = names.clone();
        deduped.sort();
        deduped.dedup();
        assert_eq!(names.len(), deduped.len());
    }
}
