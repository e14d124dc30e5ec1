//! rmcp-plex: MCP server for Plex Media Server control
//!
//! One binary, eight tool domains: library, media, playlist, collection,
//! user, sessions, server, client. Every tool is a thin adapter over the
//! Plex HTTP API returning a uniform JSON envelope.

use std::net::SocketAddr;
use std::sync::Arc;

use clap::{Parser, Subcommand, ValueEnum};
use rmcp::{
    handler::server::{router::tool::ToolRouter, wrapper::Parameters, ServerHandler},
    model::*,
    ErrorData as McpError,
    ServiceExt,
};
use schemars::JsonSchema;
use serde::Deserialize;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

// === Modules ===

mod config;
mod plex;
mod shared;
mod tools;

use config::{Config, OAuthSettings};
use plex::PlexHandle;

// === CLI ===

#[derive(Parser)]
#[command(name = "rmcp-plex")]
#[command(about = "MCP server for Plex Media Server control")]
struct Cli {
    /// Transport to serve on
    #[arg(long, value_enum, default_value_t = Transport::Stdio)]
    transport: Transport,
    /// Host to bind (SSE transport)
    #[arg(long, default_value = "127.0.0.1")]
    host: String,
    /// Port to listen on (SSE transport)
    #[arg(long, default_value_t = 3001)]
    port: u16,
    /// Plex server URL (overrides PLEX_URL and the config file)
    #[arg(long)]
    url: Option<String>,
    /// Plex auth token (overrides PLEX_TOKEN and the config file)
    #[arg(long)]
    token: Option<String>,
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Transport {
    Stdio,
    Sse,
}

#[derive(Subcommand)]
enum Commands {
    /// Open the config file in your editor
    Config,
}

// === Common Parameter Types ===

#[derive(Debug, Deserialize, JsonSchema)]
pub struct EmptyParams {}

// === Server ===

pub struct PlexMcpServer {
    pub tool_router: ToolRouter<Self>,
    plex: Arc<PlexHandle>,
}

impl PlexMcpServer {
    pub fn new(config: Config) -> Self {
        let plex = Arc::new(PlexHandle::new(config.clone()));
        Self::with_handle(&config, plex)
    }

    /// Build a server instance sharing an existing connection handle
    /// (every SSE connection gets its own router over the same handle).
    pub fn with_handle(config: &Config, plex: Arc<PlexHandle>) -> Self {
        let mut tool_router = Self::tool_router();

        let disabled_count = config.disabled.len();
        for tool_name in &config.disabled {
            if tool_router.has_route(tool_name) {
                tool_router.remove_route(tool_name);
                tracing::info!("Disabled tool: {}", tool_name);
            } else {
                tracing::warn!("Config disables unknown tool: {}", tool_name);
            }
        }
        if disabled_count > 0 {
            tracing::info!(
                "Loaded config: {} tools disabled, {} tools active",
                disabled_count,
                tool_router.map.len()
            );
        }

        Self { tool_router, plex }
    }
}

// Tool implementations
#[rmcp::tool_router]
impl PlexMcpServer {
    // ============================================================
    // LIBRARY
    // ============================================================

    #[rmcp::tool(description = "List all library sections with their types and item counts")]
    pub async fn library_list(
        &self,
        Parameters(_params): Parameters<EmptyParams>,
    ) -> Result<CallToolResult, McpError> {
        tools::library::list(&self.plex).await
    }

    #[rmcp::tool(description = "Get statistics for a library: item counts, and for movie libraries the top genres, directors, studios and items per decade")]
    pub async fn library_get_stats(
        &self,
        Parameters(params): Parameters<tools::library::LibraryNameParams>,
    ) -> Result<CallToolResult, McpError> {
        tools::library::get_stats(&self.plex, params).await
    }

    #[rmcp::tool(description = "Get a library's details: folder locations, agent, scanner and language")]
    pub async fn library_get_details(
        &self,
        Parameters(params): Parameters<tools::library::LibraryNameParams>,
    ) -> Result<CallToolResult, McpError> {
        tools::library::get_details(&self.plex, params).await
    }

    #[rmcp::tool(description = "Refresh metadata for one library, or all libraries when none is given")]
    pub async fn library_refresh(
        &self,
        Parameters(params): Parameters<tools::library::RefreshParams>,
    ) -> Result<CallToolResult, McpError> {
        tools::library::refresh(&self.plex, params).await
    }

    #[rmcp::tool(description = "Scan a library for new files, optionally only one folder path")]
    pub async fn library_scan(
        &self,
        Parameters(params): Parameters<tools::library::ScanParams>,
    ) -> Result<CallToolResult, McpError> {
        tools::library::scan(&self.plex, params).await
    }

    #[rmcp::tool(description = "Get recently added media, across all libraries or in one library")]
    pub async fn library_get_recently_added(
        &self,
        Parameters(params): Parameters<tools::library::RecentlyAddedParams>,
    ) -> Result<CallToolResult, McpError> {
        tools::library::get_recently_added(&self.plex, params).await
    }

    #[rmcp::tool(description = "List a library's contents with limit/offset and optional filters: watched state, genre, year, rating, person, resolution, studio, network")]
    pub async fn library_get_contents(
        &self,
        Parameters(params): Parameters<tools::library::ContentsParams>,
    ) -> Result<CallToolResult, McpError> {
        tools::library::get_contents(&self.plex, params).await
    }

    // ============================================================
    // MEDIA
    // ============================================================

    #[rmcp::tool(description = "Search for media across all libraries, optionally narrowed to one content type")]
    pub async fn media_search(
        &self,
        Parameters(params): Parameters<tools::media::SearchParams>,
    ) -> Result<CallToolResult, McpError> {
        tools::media::search(&self.plex, params).await
    }

    #[rmcp::tool(description = "Get detailed information about one media item, by title or by id")]
    pub async fn media_get_details(
        &self,
        Parameters(params): Parameters<tools::media::MediaRefParams>,
    ) -> Result<CallToolResult, McpError> {
        tools::media::get_details(&self.plex, params).await
    }

    #[rmcp::tool(description = "Edit a media item's metadata: title, summary, rating, release date, studio, genres, labels")]
    pub async fn media_edit_metadata(
        &self,
        Parameters(params): Parameters<tools::media::EditMetadataParams>,
    ) -> Result<CallToolResult, McpError> {
        tools::media::edit_metadata(&self.plex, params).await
    }

    #[rmcp::tool(description = "Delete a media item from the library. This cannot be undone!")]
    pub async fn media_delete(
        &self,
        Parameters(params): Parameters<tools::media::MediaRefParams>,
    ) -> Result<CallToolResult, McpError> {
        tools::media::delete(&self.plex, params).await
    }

    #[rmcp::tool(description = "List available artwork versions (posters, backgrounds, logos) for a media item")]
    pub async fn media_list_artwork(
        &self,
        Parameters(params): Parameters<tools::media::ArtworkListParams>,
    ) -> Result<CallToolResult, McpError> {
        tools::media::list_artwork(&self.plex, params).await
    }

    #[rmcp::tool(description = "Set a media item's poster, background or logo from a URL or local file")]
    pub async fn media_set_artwork(
        &self,
        Parameters(params): Parameters<tools::media::SetArtworkParams>,
    ) -> Result<CallToolResult, McpError> {
        tools::media::set_artwork(&self.plex, params).await
    }

    #[rmcp::tool(description = "Fetch a media item's current artwork as base64 data or a URL")]
    pub async fn media_get_artwork(
        &self,
        Parameters(params): Parameters<tools::media::GetArtworkParams>,
    ) -> Result<CallToolResult, McpError> {
        tools::media::get_artwork(&self.plex, params).await
    }

    // ============================================================
    // PLAYLIST
    // ============================================================

    #[rmcp::tool(description = "List playlists, optionally filtered by library or content type (audio, video, photo)")]
    pub async fn playlist_list(
        &self,
        Parameters(params): Parameters<tools::playlist::ListParams>,
    ) -> Result<CallToolResult, McpError> {
        tools::playlist::list(&self.plex, params).await
    }

    #[rmcp::tool(description = "Get a playlist's items, in playlist order")]
    pub async fn playlist_get_contents(
        &self,
        Parameters(params): Parameters<tools::playlist::TitleParams>,
    ) -> Result<CallToolResult, McpError> {
        tools::playlist::get_contents(&self.plex, params).await
    }

    #[rmcp::tool(description = "Create a playlist from a list of media titles, kept in submitted order")]
    pub async fn playlist_create(
        &self,
        Parameters(params): Parameters<tools::playlist::CreateParams>,
    ) -> Result<CallToolResult, McpError> {
        tools::playlist::create(&self.plex, params).await
    }

    #[rmcp::tool(description = "Add items to an existing playlist")]
    pub async fn playlist_add_items(
        &self,
        Parameters(params): Parameters<tools::playlist::ModifyParams>,
    ) -> Result<CallToolResult, McpError> {
        tools::playlist::add_items(&self.plex, params).await
    }

    #[rmcp::tool(description = "Remove items from a playlist by title")]
    pub async fn playlist_remove_items(
        &self,
        Parameters(params): Parameters<tools::playlist::RemoveParams>,
    ) -> Result<CallToolResult, McpError> {
        tools::playlist::remove_items(&self.plex, params).await
    }

    #[rmcp::tool(description = "Delete a playlist")]
    pub async fn playlist_delete(
        &self,
        Parameters(params): Parameters<tools::playlist::TitleParams>,
    ) -> Result<CallToolResult, McpError> {
        tools::playlist::delete(&self.plex, params).await
    }

    // ============================================================
    // COLLECTION
    // ============================================================

    #[rmcp::tool(description = "List collections, on the whole server or in one library")]
    pub async fn collection_list(
        &self,
        Parameters(params): Parameters<tools::collection::ListParams>,
    ) -> Result<CallToolResult, McpError> {
        tools::collection::list(&self.plex, params).await
    }

    #[rmcp::tool(description = "Get a collection's items (server-assigned order)")]
    pub async fn collection_get_contents(
        &self,
        Parameters(params): Parameters<tools::collection::RefParams>,
    ) -> Result<CallToolResult, McpError> {
        tools::collection::get_contents(&self.plex, params).await
    }

    #[rmcp::tool(description = "Create a collection in a library from a list of media titles")]
    pub async fn collection_create(
        &self,
        Parameters(params): Parameters<tools::collection::CreateParams>,
    ) -> Result<CallToolResult, McpError> {
        tools::collection::create(&self.plex, params).await
    }

    #[rmcp::tool(description = "Add items to an existing collection")]
    pub async fn collection_add_items(
        &self,
        Parameters(params): Parameters<tools::collection::ModifyParams>,
    ) -> Result<CallToolResult, McpError> {
        tools::collection::add_items(&self.plex, params).await
    }

    #[rmcp::tool(description = "Remove items from a collection by title")]
    pub async fn collection_remove_items(
        &self,
        Parameters(params): Parameters<tools::collection::ModifyParams>,
    ) -> Result<CallToolResult, McpError> {
        tools::collection::remove_items(&self.plex, params).await
    }

    #[rmcp::tool(description = "Delete a collection")]
    pub async fn collection_delete(
        &self,
        Parameters(params): Parameters<tools::collection::DeleteParams>,
    ) -> Result<CallToolResult, McpError> {
        tools::collection::delete(&self.plex, params).await
    }

    #[rmcp::tool(description = "Edit a collection's title, sort title, summary, content rating or labels")]
    pub async fn collection_edit(
        &self,
        Parameters(params): Parameters<tools::collection::EditParams>,
    ) -> Result<CallToolResult, McpError> {
        tools::collection::edit(&self.plex, params).await
    }

    // ============================================================
    // USER
    // ============================================================

    #[rmcp::tool(description = "Search users by name, username or email, or list everyone with access")]
    pub async fn user_search(
        &self,
        Parameters(params): Parameters<tools::user::SearchParams>,
    ) -> Result<CallToolResult, McpError> {
        tools::user::search(&self.plex, params).await
    }

    #[rmcp::tool(description = "Get details for one user (defaults to the owner account)")]
    pub async fn user_get_info(
        &self,
        Parameters(params): Parameters<tools::user::UserParams>,
    ) -> Result<CallToolResult, McpError> {
        tools::user::get_info(&self.plex, params).await
    }

    #[rmcp::tool(description = "Get on-deck (in progress) items for the owner account")]
    pub async fn user_get_on_deck(
        &self,
        Parameters(params): Parameters<tools::user::UserParams>,
    ) -> Result<CallToolResult, McpError> {
        tools::user::get_on_deck(&self.plex, params).await
    }

    #[rmcp::tool(description = "Get recent watch history for a user")]
    pub async fn user_get_watch_history(
        &self,
        Parameters(params): Parameters<tools::user::HistoryParams>,
    ) -> Result<CallToolResult, McpError> {
        tools::user::get_watch_history(&self.plex, params).await
    }

    // ============================================================
    // SESSIONS
    // ============================================================

    #[rmcp::tool(description = "Get current playback sessions with players, users, progress and transcode state")]
    pub async fn sessions_get_active(
        &self,
        Parameters(_params): Parameters<EmptyParams>,
    ) -> Result<CallToolResult, McpError> {
        tools::sessions::get_active(&self.plex).await
    }

    #[rmcp::tool(description = "Get playback history for one media item, by title or by id")]
    pub async fn sessions_get_history(
        &self,
        Parameters(params): Parameters<tools::sessions::HistoryParams>,
    ) -> Result<CallToolResult, McpError> {
        tools::sessions::get_history(&self.plex, params).await
    }

    // ============================================================
    // SERVER
    // ============================================================

    #[rmcp::tool(description = "Get Plex server information: version, platform, transcoder capabilities")]
    pub async fn server_get_info(
        &self,
        Parameters(_params): Parameters<EmptyParams>,
    ) -> Result<CallToolResult, McpError> {
        tools::server::get_info(&self.plex).await
    }

    #[rmcp::tool(description = "Get bandwidth statistics, optionally per timespan (seconds to months) and LAN/WAN")]
    pub async fn server_get_bandwidth(
        &self,
        Parameters(params): Parameters<tools::server::BandwidthParams>,
    ) -> Result<CallToolResult, McpError> {
        tools::server::get_bandwidth(&self.plex, params).await
    }

    #[rmcp::tool(description = "Get host and process CPU/memory utilization samples")]
    pub async fn server_get_resources(
        &self,
        Parameters(_params): Parameters<EmptyParams>,
    ) -> Result<CallToolResult, McpError> {
        tools::server::get_resources(&self.plex).await
    }

    #[rmcp::tool(description = "List the server's scheduled butler (maintenance) tasks")]
    pub async fn server_list_butler_tasks(
        &self,
        Parameters(_params): Parameters<EmptyParams>,
    ) -> Result<CallToolResult, McpError> {
        tools::server::list_butler_tasks(&self.plex).await
    }

    #[rmcp::tool(description = "Run a butler maintenance task now, e.g. BackupDatabase or OptimizeDatabase")]
    pub async fn server_run_butler_task(
        &self,
        Parameters(params): Parameters<tools::server::ButlerTaskParams>,
    ) -> Result<CallToolResult, McpError> {
        tools::server::run_butler_task(&self.plex, params).await
    }

    // ============================================================
    // CLIENT
    // ============================================================

    #[rmcp::tool(description = "List controllable Plex clients, including players of live sessions")]
    pub async fn client_list(
        &self,
        Parameters(params): Parameters<tools::client::ListParams>,
    ) -> Result<CallToolResult, McpError> {
        tools::client::list(&self.plex, params).await
    }

    #[rmcp::tool(description = "Get detailed information about one client")]
    pub async fn client_get_details(
        &self,
        Parameters(params): Parameters<tools::client::NameParams>,
    ) -> Result<CallToolResult, McpError> {
        tools::client::get_details(&self.plex, params).await
    }

    #[rmcp::tool(description = "Get all clients that are currently playing media")]
    pub async fn client_get_active(
        &self,
        Parameters(_params): Parameters<EmptyParams>,
    ) -> Result<CallToolResult, McpError> {
        tools::client::get_active(&self.plex).await
    }

    #[rmcp::tool(description = "Get the current playback timeline of a client")]
    pub async fn client_get_timeline(
        &self,
        Parameters(params): Parameters<tools::client::NameParams>,
    ) -> Result<CallToolResult, McpError> {
        tools::client::get_timeline(&self.plex, params).await
    }

    #[rmcp::tool(description = "Start playback of a media item on a client")]
    pub async fn client_start_playback(
        &self,
        Parameters(params): Parameters<tools::client::StartPlaybackParams>,
    ) -> Result<CallToolResult, McpError> {
        tools::client::start_playback(&self.plex, params).await
    }

    #[rmcp::tool(description = "Control playback on a client: play, pause, stop, skip, step, seek, volume, mute")]
    pub async fn client_control_playback(
        &self,
        Parameters(params): Parameters<tools::client::ControlParams>,
    ) -> Result<CallToolResult, McpError> {
        tools::client::control_playback(&self.plex, params).await
    }

    #[rmcp::tool(description = "Navigate a client's interface: directions, select, back, home, contextMenu")]
    pub async fn client_navigate(
        &self,
        Parameters(params): Parameters<tools::client::NavigateParams>,
    ) -> Result<CallToolResult, McpError> {
        tools::client::navigate(&self.plex, params).await
    }

    #[rmcp::tool(description = "Switch audio, subtitle or video streams for current playback on a client")]
    pub async fn client_set_streams(
        &self,
        Parameters(params): Parameters<tools::client::SetStreamsParams>,
    ) -> Result<CallToolResult, McpError> {
        tools::client::set_streams(&self.plex, params).await
    }
}

#[rmcp::tool_handler]
impl ServerHandler for PlexMcpServer {
    fn get_info(&self) -> ServerInfo {
        let description = concat!(
            "rmcp-plex: Plex Media Server control.\n",
            "- library: sections, stats, refresh/scan, contents with filters\n",
            "- media: search, details, metadata editing, deletion, artwork\n",
            "- playlist/collection: list, contents, create, modify, delete\n",
            "- user/sessions: accounts, on-deck, watch history, live sessions\n",
            "- server: info, bandwidth, resources, butler tasks\n",
            "- client: discovery, timelines, playback and navigation control\n",
        );

        ServerInfo {
            protocol_version: ProtocolVersion::V_2024_11_05,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation::from_build_env(),
            instructions: Some(description.to_string()),
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Config) => {
            run_config_command()?;
        }
        None => {
            run_server(&cli).await?;
        }
    }

    Ok(())
}

/// Open config file in user's editor
fn run_config_command() -> anyhow::Result<()> {
    let config_path =
        Config::path().ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?;

    if let Some(parent) = config_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    // Create config file from template if it doesn't exist
    if !config_path.exists() {
        let template = include_str!("../config.toml.example");
        std::fs::write(&config_path, template)?;
        println!("Created config file: {}", config_path.display());
    }

    let editor = std::env::var("EDITOR")
        .or_else(|_| std::env::var("VISUAL"))
        .unwrap_or_else(|_| {
            #[cfg(target_os = "windows")]
            {
                "notepad".to_string()
            }
            #[cfg(not(target_os = "windows"))]
            {
                "nano".to_string()
            }
        });

    println!("Opening {} with {}", config_path.display(), editor);

    std::process::Command::new(&editor)
        .arg(&config_path)
        .status()?;

    Ok(())
}

/// Run the MCP server on the selected transport
async fn run_server(cli: &Cli) -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let mut config = Config::load();
    // CLI flags win over environment and file.
    if let Some(url) = &cli.url {
        config.url = Some(url.clone());
    }
    if let Some(token) = &cli.token {
        config.token = Some(token.clone());
    }

    match cli.transport {
        Transport::Stdio => run_stdio_server(config).await,
        Transport::Sse => run_sse_server(config, &cli.host, cli.port).await,
    }
}

async fn run_stdio_server(config: Config) -> anyhow::Result<()> {
    tracing::info!("Starting rmcp-plex server (stdio)");

    let server = PlexMcpServer::new(config);
    let service = server.serve(rmcp::transport::stdio()).await?;
    service.waiting().await?;

    tracing::info!("rmcp-plex server stopped");
    Ok(())
}

async fn run_sse_server(config: Config, host: &str, port: u16) -> anyhow::Result<()> {
    use rmcp::transport::sse_server::{SseServer, SseServerConfig};

    let bind: SocketAddr = format!("{host}:{port}").parse()?;
    let (sse_server, router) = SseServer::new(SseServerConfig {
        bind,
        sse_path: "/sse".to_string(),
        post_path: "/message".to_string(),
        ct: tokio_util::sync::CancellationToken::new(),
        sse_keep_alive: None,
    });

    let router = if config.oauth.enabled {
        router.merge(oauth_discovery_router(&config.oauth)?)
    } else {
        router
    };

    let listener = tokio::net::TcpListener::bind(bind).await?;
    let plex = Arc::new(PlexHandle::new(config.clone()));
    let service_config = config.clone();
    let ct = sse_server.with_service(move || PlexMcpServer::with_handle(&service_config, plex.clone()));

    tracing::info!("Starting rmcp-plex server (SSE) at http://{bind}/sse");
    axum::serve(listener, router)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await?;

    ct.cancel();
    tracing::info!("rmcp-plex server stopped");
    Ok(())
}

/// OAuth 2.1 discovery documents for remote mode: the protected-resource
/// document names the external issuer, and the authorization-server path
/// forwards to the issuer's own metadata.
fn oauth_discovery_router(oauth: &OAuthSettings) -> anyhow::Result<axum::Router> {
    use axum::response::Redirect;
    use axum::routing::get;
    use axum::{Json, Router};

    let issuer = oauth
        .issuer
        .clone()
        .ok_or_else(|| anyhow::anyhow!("OAuth is enabled but no issuer is configured"))?;
    let public_url = oauth
        .public_url
        .clone()
        .ok_or_else(|| anyhow::anyhow!("OAuth is enabled but no public URL is configured"))?;

    let resource_doc = serde_json::json!({
        "resource": public_url,
        "authorization_servers": [issuer],
        "bearer_methods_supported": ["header"],
    });
    let issuer_metadata = format!(
        "{}/.well-known/oauth-authorization-server",
        issuer.trim_end_matches('/')
    );

    Ok(Router::new()
        .route(
            "/.well-known/oauth-protected-resource",
            get(move || {
                let doc = resource_doc.clone();
                async move { Json(doc) }
            }),
        )
        .route(
            "/.well-known/oauth-authorization-server",
            get(move || {
                let target = issuer_metadata.clone();
                async move { Redirect::temporary(&target) }
            }),
        ))
}
