//! Plex connection handle and thin typed HTTP client.
//!
//! One `PlexClient` per process, opened lazily on the first tool call and
//! reused for the process lifetime. Connection pooling, keep-alive and
//! redirects are whatever `reqwest` does by default; there is no retry or
//! backoff layer on top.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use reqwest::header::ACCEPT;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use tokio::sync::OnceCell;

use crate::config::Config;

pub mod types;

use types::*;

const PLEX_TV: &str = "https://plex.tv";
const CLIENT_IDENTIFIER: &str = "rmcp-plex";
const LIBRARY_PROVIDER: &str = "com.plexapp.plugins.library";
const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, thiserror::Error)]
pub enum PlexError {
    #[error("no Plex credentials configured: set PLEX_URL and PLEX_TOKEN, or PLEX_USERNAME, PLEX_PASSWORD and PLEX_SERVER_NAME")]
    NotConfigured,
    #[error("server '{0}' not found among the account's resources")]
    ServerNotFound(String),
    #[error("server '{0}' has no reachable connection")]
    NoConnection(String),
    #[error("{0} returned HTTP {1}")]
    Status(String, StatusCode),
    #[error(transparent)]
    Http(#[from] reqwest::Error),
}

/// Lazily-initialized process-wide connection. Cloning the surrounding
/// `Arc` shares the same cell, so every tool call after the first reuses
/// the verified client.
pub struct PlexHandle {
    config: Config,
    cell: OnceCell<PlexClient>,
}

impl PlexHandle {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            cell: OnceCell::new(),
        }
    }

    pub async fn client(&self) -> Result<&PlexClient, PlexError> {
        self.cell
            .get_or_try_init(|| PlexClient::connect(&self.config))
            .await
    }
}

pub struct PlexClient {
    http: reqwest::Client,
    base: String,
    token: String,
    /// plex.tv token; identical to `token` unless the account sign-in flow
    /// handed us a per-server access token.
    account_token: String,
    machine_identifier: String,
    command_id: AtomicU64,
}

impl PlexClient {
    /// Open and verify a connection using whichever credential path the
    /// config provides: direct URL + token, or account sign-in + resource
    /// discovery by server name.
    pub async fn connect(config: &Config) -> Result<Self, PlexError> {
        let http = reqwest::Client::builder()
            .timeout(CONNECT_TIMEOUT)
            .build()?;

        let (base, token, account_token) = match (&config.url, &config.token) {
            (Some(url), Some(token)) => (url.clone(), token.clone(), token.clone()),
            _ => match (&config.username, &config.password, &config.server_name) {
                (Some(user), Some(pass), Some(server)) => {
                    let account_token = tv_signin(&http, user, pass).await?;
                    let (uri, access) = discover_server(&http, &account_token, server).await?;
                    (uri, access, account_token)
                }
                _ => return Err(PlexError::NotConfigured),
            },
        };

        let mut client = Self {
            http,
            base: base.trim_end_matches('/').to_string(),
            token,
            account_token,
            machine_identifier: String::new(),
            command_id: AtomicU64::new(0),
        };

        let identity: MediaContainer<Identity> = client.get_json("/identity", &[]).await?;
        client.machine_identifier = identity
            .media_container
            .machine_identifier
            .unwrap_or_default();
        tracing::info!(
            server = %client.base,
            machine = %client.machine_identifier,
            "Connected to Plex server"
        );
        Ok(client)
    }

    pub fn machine_identifier(&self) -> &str {
        &self.machine_identifier
    }

    /// Build the `server://` uri that play queue and playlist endpoints
    /// expect for a set of items.
    pub fn library_uri(&self, rating_keys: &[String]) -> String {
        format!(
            "server://{}/{}/library/metadata/{}",
            self.machine_identifier,
            LIBRARY_PROVIDER,
            rating_keys.join(",")
        )
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }

    async fn send(
        &self,
        req: reqwest::RequestBuilder,
        what: &str,
    ) -> Result<reqwest::Response, PlexError> {
        let resp = req
            .header("X-Plex-Token", &self.token)
            .header("X-Plex-Client-Identifier", CLIENT_IDENTIFIER)
            .header(ACCEPT, "application/json")
            .send()
            .await?;
        if !resp.status().is_success() {
            return Err(PlexError::Status(what.to_string(), resp.status()));
        }
        Ok(resp)
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, PlexError> {
        let resp = self
            .send(self.http.get(self.url(path)).query(query), path)
            .await?;
        Ok(resp.json().await?)
    }

    async fn items(&self, path: &str, query: &[(&str, String)]) -> Result<Vec<MediaItem>, PlexError> {
        let container: MediaContainer<ItemsContainer> = self.get_json(path, query).await?;
        Ok(container.media_container.metadata)
    }

    // === Library sections ===

    pub async fn sections(&self) -> Result<Vec<Section>, PlexError> {
        let container: MediaContainer<DirectoryContainer> =
            self.get_json("/library/sections", &[]).await?;
        Ok(container.media_container.directory)
    }

    /// Case-insensitive section lookup by title.
    pub async fn section_by_title(&self, name: &str) -> Result<Option<Section>, PlexError> {
        let sections = self.sections().await?;
        Ok(sections
            .into_iter()
            .find(|s| s.title.eq_ignore_ascii_case(name)))
    }

    pub async fn section_items(
        &self,
        section_key: &str,
        title: Option<&str>,
        type_code: Option<i32>,
    ) -> Result<Vec<MediaItem>, PlexError> {
        let mut query: Vec<(&str, String)> = Vec::new();
        if let Some(title) = title {
            query.push(("title", title.to_string()));
        }
        if let Some(code) = type_code {
            query.push(("type", code.to_string()));
        }
        self.items(&format!("/library/sections/{section_key}/all"), &query)
            .await
    }

    /// Item count of a section without fetching its contents.
    pub async fn section_size(&self, section_key: &str) -> Result<Option<i64>, PlexError> {
        let container: MediaContainer<ItemsContainer> = self
            .get_json(
                &format!("/library/sections/{section_key}/all"),
                &[
                    ("X-Plex-Container-Start", "0".to_string()),
                    ("X-Plex-Container-Size", "0".to_string()),
                ],
            )
            .await?;
        Ok(container.media_container.total_size)
    }

    pub async fn section_recently_added(
        &self,
        section_key: &str,
        limit: usize,
    ) -> Result<Vec<MediaItem>, PlexError> {
        self.items(
            &format!("/library/sections/{section_key}/recentlyAdded"),
            &[
                ("X-Plex-Container-Start", "0".to_string()),
                ("X-Plex-Container-Size", limit.to_string()),
            ],
        )
        .await
    }

    pub async fn recently_added(&self, limit: usize) -> Result<Vec<MediaItem>, PlexError> {
        self.items(
            "/library/recentlyAdded",
            &[
                ("X-Plex-Container-Start", "0".to_string()),
                ("X-Plex-Container-Size", limit.to_string()),
            ],
        )
        .await
    }

    /// Scan a section for new files, optionally only one path.
    pub async fn scan_section(
        &self,
        section_key: &str,
        path: Option<&str>,
    ) -> Result<(), PlexError> {
        let mut query: Vec<(&str, String)> = Vec::new();
        if let Some(p) = path {
            query.push(("path", p.to_string()));
        }
        let url = format!("/library/sections/{section_key}/refresh");
        self.send(self.http.get(self.url(&url)).query(&query), &url)
            .await?;
        Ok(())
    }

    /// Force a metadata refresh of one section.
    pub async fn refresh_section(&self, section_key: &str) -> Result<(), PlexError> {
        let url = format!("/library/sections/{section_key}/refresh");
        self.send(
            self.http.get(self.url(&url)).query(&[("force", "1")]),
            &url,
        )
        .await?;
        Ok(())
    }

    pub async fn refresh_all_sections(&self) -> Result<(), PlexError> {
        self.send(
            self.http.get(self.url("/library/sections/all/refresh")),
            "/library/sections/all/refresh",
        )
        .await?;
        Ok(())
    }

    // === Items ===

    /// Server-wide hub search.
    pub async fn search(&self, query: &str, limit: usize) -> Result<Vec<MediaItem>, PlexError> {
        let container: MediaContainer<SearchContainer> = self
            .get_json(
                "/library/search",
                &[
                    ("query", query.to_string()),
                    ("limit", limit.to_string()),
                    ("includeCollections", "1".to_string()),
                ],
            )
            .await?;
        Ok(container
            .media_container
            .search_result
            .into_iter()
            .filter_map(|r| r.metadata)
            .collect())
    }

    /// Fetch a single item by rating key; `None` when the server has no
    /// such key.
    pub async fn fetch_item(&self, rating_key: &str) -> Result<Option<MediaItem>, PlexError> {
        let path = format!("/library/metadata/{rating_key}");
        let resp = self
            .http
            .get(self.url(&path))
            .header("X-Plex-Token", &self.token)
            .header("X-Plex-Client-Identifier", CLIENT_IDENTIFIER)
            .header(ACCEPT, "application/json")
            .send()
            .await?;
        if resp.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !resp.status().is_success() {
            return Err(PlexError::Status(path, resp.status()));
        }
        let container: MediaContainer<ItemsContainer> = resp.json().await?;
        Ok(container.media_container.metadata.into_iter().next())
    }

    pub async fn item_children(&self, rating_key: &str) -> Result<Vec<MediaItem>, PlexError> {
        self.items(&format!("/library/metadata/{rating_key}/children"), &[])
            .await
    }

    /// Apply metadata field edits (`title.value=...&title.locked=1` style
    /// pairs) to one item.
    pub async fn edit_item(
        &self,
        rating_key: &str,
        params: &[(String, String)],
    ) -> Result<(), PlexError> {
        let path = format!("/library/metadata/{rating_key}");
        self.send(self.http.put(self.url(&path)).query(params), &path)
            .await?;
        Ok(())
    }

    /// Collections are edited through their section's `all` endpoint.
    pub async fn edit_in_section(
        &self,
        section_key: &str,
        params: &[(String, String)],
    ) -> Result<(), PlexError> {
        let path = format!("/library/sections/{section_key}/all");
        self.send(self.http.put(self.url(&path)).query(params), &path)
            .await?;
        Ok(())
    }

    pub async fn rate_item(&self, rating_key: &str, rating: f64) -> Result<(), PlexError> {
        self.send(
            self.http.put(self.url("/:/rate")).query(&[
                ("key", rating_key.to_string()),
                ("identifier", LIBRARY_PROVIDER.to_string()),
                ("rating", rating.to_string()),
            ]),
            "/:/rate",
        )
        .await?;
        Ok(())
    }

    pub async fn delete_item(&self, rating_key: &str) -> Result<(), PlexError> {
        let path = format!("/library/metadata/{rating_key}");
        self.send(self.http.delete(self.url(&path)), &path).await?;
        Ok(())
    }

    // === Artwork ===

    pub async fn list_artwork(
        &self,
        rating_key: &str,
        kind: &str,
    ) -> Result<Vec<ArtworkEntry>, PlexError> {
        let container: MediaContainer<ArtContainer> = self
            .get_json(&format!("/library/metadata/{rating_key}/{kind}"), &[])
            .await?;
        Ok(container.media_container.metadata)
    }

    pub async fn set_artwork_from_url(
        &self,
        rating_key: &str,
        kind: &str,
        url: &str,
    ) -> Result<(), PlexError> {
        let path = format!("/library/metadata/{rating_key}/{kind}");
        self.send(
            self.http
                .post(self.url(&path))
                .query(&[("url", url.to_string())]),
            &path,
        )
        .await?;
        Ok(())
    }

    pub async fn upload_artwork(
        &self,
        rating_key: &str,
        kind: &str,
        data: Vec<u8>,
    ) -> Result<(), PlexError> {
        let path = format!("/library/metadata/{rating_key}/{kind}");
        self.send(self.http.post(self.url(&path)).body(data), &path)
            .await?;
        Ok(())
    }

    /// Absolute, token-authenticated URL for a server-relative image path.
    pub fn image_url(&self, path: &str) -> String {
        format!(
            "{}{}?X-Plex-Token={}",
            self.base,
            path,
            urlencoding::encode(&self.token)
        )
    }

    /// Download raw image bytes from an absolute URL or a server-relative
    /// path (thumb/art keys).
    pub async fn fetch_bytes(&self, path_or_url: &str) -> Result<Vec<u8>, PlexError> {
        let url = if path_or_url.starts_with("http://") || path_or_url.starts_with("https://") {
            path_or_url.to_string()
        } else {
            self.url(path_or_url)
        };
        let resp = self
            .send(self.http.get(url), path_or_url)
            .await?;
        Ok(resp.bytes().await?.to_vec())
    }

    // === Playlists ===

    pub async fn playlists(
        &self,
        playlist_type: Option<&str>,
    ) -> Result<Vec<MediaItem>, PlexError> {
        let mut query: Vec<(&str, String)> = Vec::new();
        if let Some(t) = playlist_type {
            query.push(("playlistType", t.to_string()));
        }
        self.items("/playlists", &query).await
    }

    pub async fn playlist_items(&self, rating_key: &str) -> Result<Vec<MediaItem>, PlexError> {
        self.items(&format!("/playlists/{rating_key}/items"), &[])
            .await
    }

    pub async fn create_playlist(
        &self,
        title: &str,
        playlist_type: &str,
        rating_keys: &[String],
    ) -> Result<Option<MediaItem>, PlexError> {
        let resp = self
            .send(
                self.http.post(self.url("/playlists")).query(&[
                    ("title", title.to_string()),
                    ("type", playlist_type.to_string()),
                    ("smart", "0".to_string()),
                    ("uri", self.library_uri(rating_keys)),
                ]),
                "/playlists",
            )
            .await?;
        let container: MediaContainer<ItemsContainer> = resp.json().await?;
        Ok(container.media_container.metadata.into_iter().next())
    }

    pub async fn playlist_add_items(
        &self,
        rating_key: &str,
        item_keys: &[String],
    ) -> Result<(), PlexError> {
        let path = format!("/playlists/{rating_key}/items");
        self.send(
            self.http
                .put(self.url(&path))
                .query(&[("uri", self.library_uri(item_keys))]),
            &path,
        )
        .await?;
        Ok(())
    }

    /// Removal is addressed by the playlist-item id, not the rating key.
    pub async fn playlist_remove_item(
        &self,
        rating_key: &str,
        playlist_item_id: i64,
    ) -> Result<(), PlexError> {
        let path = format!("/playlists/{rating_key}/items/{playlist_item_id}");
        self.send(self.http.delete(self.url(&path)), &path).await?;
        Ok(())
    }

    pub async fn delete_playlist(&self, rating_key: &str) -> Result<(), PlexError> {
        let path = format!("/playlists/{rating_key}");
        self.send(self.http.delete(self.url(&path)), &path).await?;
        Ok(())
    }

    // === Collections ===

    pub async fn collections(&self, section_key: &str) -> Result<Vec<MediaItem>, PlexError> {
        self.items(&format!("/library/sections/{section_key}/collections"), &[])
            .await
    }

    pub async fn collection_children(&self, rating_key: &str) -> Result<Vec<MediaItem>, PlexError> {
        self.items(&format!("/library/collections/{rating_key}/children"), &[])
            .await
    }

    pub async fn create_collection(
        &self,
        title: &str,
        type_code: i32,
        section_id: &str,
        rating_keys: &[String],
    ) -> Result<Option<MediaItem>, PlexError> {
        let resp = self
            .send(
                self.http.post(self.url("/library/collections")).query(&[
                    ("title", title.to_string()),
                    ("type", type_code.to_string()),
                    ("smart", "0".to_string()),
                    ("sectionId", section_id.to_string()),
                    ("uri", self.library_uri(rating_keys)),
                ]),
                "/library/collections",
            )
            .await?;
        let container: MediaContainer<ItemsContainer> = resp.json().await?;
        Ok(container.media_container.metadata.into_iter().next())
    }

    pub async fn collection_add_items(
        &self,
        rating_key: &str,
        item_keys: &[String],
    ) -> Result<(), PlexError> {
        let path = format!("/library/collections/{rating_key}/items");
        self.send(
            self.http
                .put(self.url(&path))
                .query(&[("uri", self.library_uri(item_keys))]),
            &path,
        )
        .await?;
        Ok(())
    }

    pub async fn collection_remove_item(
        &self,
        collection_key: &str,
        item_key: &str,
    ) -> Result<(), PlexError> {
        let path = format!("/library/collections/{collection_key}/children/{item_key}");
        self.send(self.http.delete(self.url(&path)), &path).await?;
        Ok(())
    }

    pub async fn delete_collection(&self, rating_key: &str) -> Result<(), PlexError> {
        let path = format!("/library/collections/{rating_key}");
        self.send(self.http.delete(self.url(&path)), &path).await?;
        Ok(())
    }

    // === Sessions, history, accounts ===

    pub async fn sessions(&self) -> Result<Vec<MediaItem>, PlexError> {
        self.items("/status/sessions", &[]).await
    }

    pub async fn history_for_item(&self, rating_key: &str) -> Result<Vec<MediaItem>, PlexError> {
        self.items(
            "/status/sessions/history/all",
            &[
                ("metadataItemID", rating_key.to_string()),
                ("sort", "viewedAt:desc".to_string()),
            ],
        )
        .await
    }

    pub async fn history_for_account(
        &self,
        account_id: i64,
        limit: usize,
    ) -> Result<Vec<MediaItem>, PlexError> {
        self.items(
            "/status/sessions/history/all",
            &[
                ("accountID", account_id.to_string()),
                ("sort", "viewedAt:desc".to_string()),
                ("X-Plex-Container-Start", "0".to_string()),
                ("X-Plex-Container-Size", limit.to_string()),
            ],
        )
        .await
    }

    /// Most recent history rows across all accounts.
    pub async fn history_recent(&self, limit: usize) -> Result<Vec<MediaItem>, PlexError> {
        self.items(
            "/status/sessions/history/all",
            &[
                ("sort", "viewedAt:desc".to_string()),
                ("X-Plex-Container-Start", "0".to_string()),
                ("X-Plex-Container-Size", limit.to_string()),
            ],
        )
        .await
    }

    pub async fn accounts(&self) -> Result<Vec<AccountEntry>, PlexError> {
        let container: MediaContainer<AccountsContainer> = self.get_json("/accounts", &[]).await?;
        Ok(container.media_container.account)
    }

    pub async fn account(&self, id: i64) -> Result<Option<AccountEntry>, PlexError> {
        let container: MediaContainer<AccountsContainer> =
            self.get_json(&format!("/accounts/{id}"), &[]).await?;
        Ok(container.media_container.account.into_iter().next())
    }

    pub async fn devices(&self) -> Result<Vec<DeviceEntry>, PlexError> {
        let container: MediaContainer<DevicesContainer> = self.get_json("/devices", &[]).await?;
        Ok(container.media_container.device)
    }

    pub async fn device(&self, id: i64) -> Result<Option<DeviceEntry>, PlexError> {
        let container: MediaContainer<DevicesContainer> =
            self.get_json(&format!("/devices/{id}"), &[]).await?;
        Ok(container.media_container.device.into_iter().next())
    }

    pub async fn on_deck(&self) -> Result<Vec<MediaItem>, PlexError> {
        self.items("/library/onDeck", &[]).await
    }

    // === Server statistics & maintenance ===

    pub async fn server_info(&self) -> Result<ServerRoot, PlexError> {
        let container: MediaContainer<ServerRoot> = self.get_json("/", &[]).await?;
        Ok(container.media_container)
    }

    pub async fn bandwidth(
        &self,
        timespan_code: Option<u8>,
        lan: Option<bool>,
    ) -> Result<StatisticsContainer, PlexError> {
        let mut query: Vec<(&str, String)> = Vec::new();
        if let Some(code) = timespan_code {
            query.push(("timespan", code.to_string()));
        }
        if let Some(lan) = lan {
            query.push(("lan", if lan { "1" } else { "0" }.to_string()));
        }
        let container: MediaContainer<StatisticsContainer> =
            self.get_json("/statistics/bandwidth", &query).await?;
        Ok(container.media_container)
    }

    pub async fn resource_stats(&self) -> Result<Vec<ResourceSample>, PlexError> {
        let container: MediaContainer<StatisticsContainer> = self
            .get_json("/statistics/resources", &[("timespan", "6".to_string())])
            .await?;
        Ok(container.media_container.resources)
    }

    pub async fn butler_tasks(&self) -> Result<Vec<ButlerTask>, PlexError> {
        let envelope: ButlerTasksEnvelope = self.get_json("/butler", &[]).await?;
        Ok(envelope.butler_tasks.tasks)
    }

    /// The server answers 202 Accepted for a started task; any 2xx counts.
    pub async fn run_butler_task(&self, task_name: &str) -> Result<(), PlexError> {
        let path = format!("/butler/{task_name}");
        self.send(self.http.post(self.url(&path)), &path).await?;
        Ok(())
    }

    // === Controllable clients ===

    pub async fn clients(&self) -> Result<Vec<ClientEntry>, PlexError> {
        let container: MediaContainer<ClientsContainer> = self.get_json("/clients", &[]).await?;
        Ok(container.media_container.server)
    }

    /// Send a player command through the server proxy. `path` is the
    /// `/player/...` endpoint; the target client is addressed by machine
    /// identifier header.
    pub async fn player_command(
        &self,
        machine_identifier: &str,
        path: &str,
        params: &[(String, String)],
    ) -> Result<(), PlexError> {
        let command_id = self.command_id.fetch_add(1, Ordering::Relaxed) + 1;
        let mut query: Vec<(String, String)> =
            vec![("commandID".to_string(), command_id.to_string())];
        query.extend_from_slice(params);
        self.send(
            self.http
                .get(self.url(path))
                .query(&query)
                .header("X-Plex-Target-Client-Identifier", machine_identifier),
            path,
        )
        .await?;
        Ok(())
    }

    pub async fn poll_timeline(
        &self,
        machine_identifier: &str,
    ) -> Result<Vec<TimelineEntry>, PlexError> {
        let command_id = self.command_id.fetch_add(1, Ordering::Relaxed) + 1;
        let resp = self
            .send(
                self.http
                    .get(self.url("/player/timeline/poll"))
                    .query(&[("wait", "0".to_string()), ("commandID", command_id.to_string())])
                    .header("X-Plex-Target-Client-Identifier", machine_identifier),
                "/player/timeline/poll",
            )
            .await?;
        let container: MediaContainer<TimelineContainer> = resp.json().await?;
        Ok(container.media_container.timeline)
    }

    /// Create a play queue for one item and return its id.
    pub async fn create_play_queue(
        &self,
        rating_key: &str,
        queue_type: &str,
    ) -> Result<Option<i64>, PlexError> {
        let uri = self.library_uri(&[rating_key.to_string()]);
        let resp = self
            .send(
                self.http.post(self.url("/playQueues")).query(&[
                    ("type", queue_type.to_string()),
                    ("uri", uri),
                    ("shuffle", "0".to_string()),
                    ("repeat", "0".to_string()),
                    ("continuous", "0".to_string()),
                    ("own", "1".to_string()),
                ]),
                "/playQueues",
            )
            .await?;
        let container: MediaContainer<PlayQueue> = resp.json().await?;
        Ok(container.media_container.id)
    }

    // === plex.tv account ===

    async fn tv_get<T: DeserializeOwned>(&self, path: &str) -> Result<T, PlexError> {
        let url = format!("{PLEX_TV}{path}");
        let resp = self
            .http
            .get(&url)
            .header("X-Plex-Token", &self.account_token)
            .header("X-Plex-Client-Identifier", CLIENT_IDENTIFIER)
            .header(ACCEPT, "application/json")
            .send()
            .await?;
        if !resp.status().is_success() {
            return Err(PlexError::Status(path.to_string(), resp.status()));
        }
        Ok(resp.json().await?)
    }

    /// The account that owns the configured token.
    pub async fn tv_account(&self) -> Result<TvUser, PlexError> {
        self.tv_get("/api/v2/user").await
    }

    /// Users the owner shares this server with.
    pub async fn tv_friends(&self) -> Result<Vec<TvUser>, PlexError> {
        self.tv_get("/api/v2/friends").await
    }
}

/// Sign in with username/password and return the account token.
async fn tv_signin(
    http: &reqwest::Client,
    username: &str,
    password: &str,
) -> Result<String, PlexError> {
    let resp = http
        .post(format!("{PLEX_TV}/api/v2/users/signin"))
        .header("X-Plex-Client-Identifier", CLIENT_IDENTIFIER)
        .header(ACCEPT, "application/json")
        .form(&[("login", username), ("password", password)])
        .send()
        .await?;
    if !resp.status().is_success() {
        return Err(PlexError::Status(
            "/api/v2/users/signin".to_string(),
            resp.status(),
        ));
    }
    let signin: SigninResponse = resp.json().await?;
    Ok(signin.auth_token)
}

/// Find the named server among the account's resources and pick its best
/// connection: local non-relay first, then any non-relay, then anything.
async fn discover_server(
    http: &reqwest::Client,
    account_token: &str,
    server_name: &str,
) -> Result<(String, String), PlexError> {
    let resp = http
        .get(format!("{PLEX_TV}/api/v2/resources"))
        .header("X-Plex-Token", account_token)
        .header("X-Plex-Client-Identifier", CLIENT_IDENTIFIER)
        .header(ACCEPT, "application/json")
        .query(&[("includeHttps", "1")])
        .send()
        .await?;
    if !resp.status().is_success() {
        return Err(PlexError::Status(
            "/api/v2/resources".to_string(),
            resp.status(),
        ));
    }
    let resources: Vec<TvResource> = resp.json().await?;
    let resource = resources
        .into_iter()
        .filter(|r| r.provides.contains("server"))
        .find(|r| r.name.eq_ignore_ascii_case(server_name))
        .ok_or_else(|| PlexError::ServerNotFound(server_name.to_string()))?;

    let connection = choose_connection(&resource.connections)
        .ok_or_else(|| PlexError::NoConnection(server_name.to_string()))?;
    let token = resource
        .access_token
        .clone()
        .unwrap_or_else(|| account_token.to_string());
    Ok((connection.uri.clone(), token))
}

fn choose_connection(connections: &[TvConnection]) -> Option<&TvConnection> {
    connections
        .iter()
        .find(|c| c.local == Some(true) && c.relay != Some(true))
        .or_else(|| connections.iter().find(|c| c.relay != Some(true)))
        .or_else(|| connections.first())
}

/// Numeric type codes the library endpoints use for filtering and create
/// calls.
pub fn type_code(kind: &str) -> Option<i32> {
    match kind {
        "movie" => Some(1),
        "show" => Some(2),
        "season" => Some(3),
        "episode" => Some(4),
        "artist" => Some(8),
        "album" => Some(9),
        "track" => Some(10),
        "photo" => Some(13),
        "playlist" => Some(15),
        "collection" => Some(18),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_choose_connection_prefers_local_non_relay() {
        let connections = vec![
            TvConnection {
                uri: "https://relay.plex.direct:8443".into(),
                local: Some(false),
                relay: Some(true),
            },
            TvConnection {
                uri: "https://1-2-3-4.plex.direct:32400".into(),
                local: Some(false),
                relay: Some(false),
            },
            TvConnection {
                uri: "http://192.168.1.10:32400".into(),
                local: Some(true),
                relay: Some(false),
            },
        ];
        let chosen = choose_connection(&connections).unwrap();
        assert_eq!(chosen.uri, "http://192.168.1.10:32400");
    }

    #[test]
    fn test_choose_connection_falls_back_to_relay() {
        let connections = vec![TvConnection {
            uri: "https://relay.plex.direct:8443".into(),
            local: Some(false),
            relay: Some(true),
        }];
        assert!(choose_connection(&connections).is_some());
    }

    #[test]
    fn test_type_codes() {
        assert_eq!(type_code("movie"), Some(1));
        assert_eq!(type_code("collection"), Some(18));
        assert_eq!(type_code("podcast"), None);
    }
}
