//! User tools: account search, details, on-deck and watch history.

use rmcp::{model::CallToolResult, ErrorData as McpError};
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::json;

use crate::plex::types::TvUser;
use crate::plex::{PlexClient, PlexHandle};
use crate::shared;

use super::{connect, item_summary};

// === Parameter Types ===

#[derive(Debug, Deserialize, JsonSchema)]
pub struct SearchParams {
    #[schemars(description = "Term to match against usernames, emails and display names; lists everyone when omitted")]
    pub search_term: Option<String>,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct UserParams {
    #[schemars(description = "Username (defaults to the owner account)")]
    pub username: Option<String>,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct HistoryParams {
    #[schemars(description = "Username (defaults to the owner account)")]
    pub username: Option<String>,
    #[schemars(description = "Maximum number of history entries (default: 10)")]
    pub limit: Option<usize>,
}

// === Helper Functions ===

fn matches_term(user: &TvUser, term: &str) -> bool {
    let term = term.to_lowercase();
    let fields = [&user.username, &user.email, &user.title];
    fields
        .iter()
        .any(|f| f.as_deref().is_some_and(|v| v.to_lowercase().contains(&term)))
}

fn user_entry(user: &TvUser, owner: bool) -> serde_json::Value {
    json!({
        "username": user.username,
        "email": user.email,
        "title": user.title,
        "id": user.id,
        "role": if owner { "owner" } else { "shared" },
        "home": user.home,
        "restricted": user.restricted,
    })
}

/// True when `name` refers to the owner account (or no name was given).
fn is_owner(name: Option<&str>, owner: &TvUser) -> bool {
    let Some(name) = name else {
        return true;
    };
    let wanted = name.to_lowercase();
    owner
        .username
        .as_deref()
        .is_some_and(|u| u.to_lowercase() == wanted)
        || owner
            .title
            .as_deref()
            .is_some_and(|t| t.to_lowercase() == wanted)
}

fn find_friend<'a>(friends: &'a [TvUser], name: &str) -> Option<&'a TvUser> {
    let wanted = name.to_lowercase();
    friends.iter().find(|u| {
        u.username
            .as_deref()
            .is_some_and(|v| v.to_lowercase() == wanted)
            || u.title
                .as_deref()
                .is_some_and(|v| v.to_lowercase() == wanted)
    })
}

async fn account_roster(client: &PlexClient) -> Result<(TvUser, Vec<TvUser>), String> {
    let owner = client
        .tv_account()
        .await
        .map_err(|e| format!("Error fetching account: {e}"))?;
    let friends = client
        .tv_friends()
        .await
        .map_err(|e| format!("Error fetching shared users: {e}"))?;
    Ok((owner, friends))
}

// === Tool Functions ===

pub async fn search(plex: &PlexHandle, params: SearchParams) -> Result<CallToolResult, McpError> {
    let client = match connect(plex).await {
        Ok(c) => c,
        Err(resp) => return resp,
    };
    let (owner, friends) = match account_roster(client).await {
        Ok(roster) => roster,
        Err(e) => return shared::failure(e),
    };

    let mut users = vec![user_entry(&owner, true)];
    users.extend(friends.iter().map(|u| user_entry(u, false)));

    if let Some(term) = &params.search_term {
        let mut all = vec![(owner.clone(), true)];
        all.extend(friends.iter().cloned().map(|u| (u, false)));
        users = all
            .iter()
            .filter(|(u, _)| matches_term(u, term))
            .map(|(u, owner)| user_entry(u, *owner))
            .collect();
        if users.is_empty() {
            return shared::failure(format!("No users found matching '{term}'"));
        }
    }

    shared::success(json!({"count": users.len(), "users": users}))
}

pub async fn get_info(plex: &PlexHandle, params: UserParams) -> Result<CallToolResult, McpError> {
    let client = match connect(plex).await {
        Ok(c) => c,
        Err(resp) => return resp,
    };
    let (owner, friends) = match account_roster(client).await {
        Ok(roster) => roster,
        Err(e) => return shared::failure(e),
    };

    if is_owner(params.username.as_deref(), &owner) {
        let subscription = owner.subscription.as_ref();
        return shared::success(json!({
            "role": "owner",
            "username": owner.username,
            "email": owner.email,
            "title": owner.title,
            "uuid": owner.uuid,
            "subscription_active": subscription.and_then(|s| s.active),
            "subscription_features": subscription.map(|s| s.features.clone()),
        }));
    }

    let name = params.username.unwrap_or_default();
    match find_friend(&friends, &name) {
        Some(user) => shared::success(user_entry(user, false)),
        None => shared::failure(format!("User '{name}' not found among shared users")),
    }
}

pub async fn get_on_deck(plex: &PlexHandle, params: UserParams) -> Result<CallToolResult, McpError> {
    let client = match connect(plex).await {
        Ok(c) => c,
        Err(resp) => return resp,
    };
    let owner = match client.tv_account().await {
        Ok(owner) => owner,
        Err(e) => return shared::failure(format!("Error fetching account: {e}")),
    };
    if !is_owner(params.username.as_deref(), &owner) {
        // Impersonating a shared user needs their server token, which the
        // JSON account surface doesn't hand out.
        return shared::failure(
            "On-deck items are only available for the owner account; use user_get_watch_history for shared users",
        );
    }

    let items = match client.on_deck().await {
        Ok(items) => items,
        Err(e) => return shared::failure(format!("Error getting on-deck items: {e}")),
    };
    if items.is_empty() {
        return shared::failure("No on-deck items found");
    }

    let listed: Vec<serde_json::Value> = items
        .iter()
        .map(|item| {
            let mut summary = item_summary(item);
            if let Some(obj) = summary.as_object_mut() {
                if let (Some(offset), Some(duration)) = (item.view_offset, item.duration) {
                    if duration > 0 {
                        let percent = (offset as f64 / duration as f64) * 100.0;
                        obj.insert("progress_percent".into(), ((percent * 10.0).round() / 10.0).into());
                    }
                }
            }
            summary
        })
        .collect();
    shared::success(json!({"count": listed.len(), "items": listed}))
}

pub async fn get_watch_history(
    plex: &PlexHandle,
    params: HistoryParams,
) -> Result<CallToolResult, McpError> {
    let client = match connect(plex).await {
        Ok(c) => c,
        Err(resp) => return resp,
    };
    let limit = params.limit.unwrap_or(10);
    let owner = match client.tv_account().await {
        Ok(owner) => owner,
        Err(e) => return shared::failure(format!("Error fetching account: {e}")),
    };

    let (who, rows) = if is_owner(params.username.as_deref(), &owner) {
        let rows = client.history_recent(limit).await;
        (owner.username.clone().unwrap_or_else(|| "owner".into()), rows)
    } else {
        let name = params.username.clone().unwrap_or_default();
        // Server-side account filter; the PMS account table mirrors the
        // shared users by name.
        let accounts = match client.accounts().await {
            Ok(accounts) => accounts,
            Err(e) => return shared::failure(format!("Error listing server accounts: {e}")),
        };
        let account = accounts
            .iter()
            .find(|a| a.name.eq_ignore_ascii_case(&name));
        let Some(account) = account else {
            return shared::failure(format!("User '{name}' not found"));
        };
        (name, client.history_for_account(account.id, limit).await)
    };

    let rows = match rows {
        Ok(rows) => rows,
        Err(e) => return shared::failure(format!("Error getting watch history: {e}")),
    };
    if rows.is_empty() {
        return shared::failure(format!("No watch history found for '{who}'"));
    }

    let listed: Vec<serde_json::Value> = rows
        .iter()
        .map(|row| {
            let mut summary = item_summary(row);
            if let (Some(obj), Some(viewed)) = (summary.as_object_mut(), row.viewed_at) {
                obj.insert("viewed_at".into(), viewed.into());
            }
            summary
        })
        .collect();
    shared::success(json!({"user": who, "count": listed.len(), "history": listed}))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(username: &str, email: &str, title: &str) -> TvUser {
        TvUser {
            username: Some(username.into()),
            email: Some(email.into()),
            title: Some(title.into()),
            ..Default::default()
        }
    }

    #[test]
    fn test_matches_term_spans_fields() {
        let u = user("alice", "alice@example.com", "Alice B");
        assert!(matches_term(&u, "ALICE"));
        assert!(matches_term(&u, "example.com"));
        assert!(!matches_term(&u, "bob"));
    }

    #[test]
    fn test_owner_match_is_case_insensitive_and_defaults() {
        let owner = user("Admin", "a@x.com", "The Admin");
        assert!(is_owner(None, &owner));
        assert!(is_owner(Some("admin"), &owner));
        assert!(is_owner(Some("the admin"), &owner));
        assert!(!is_owner(Some("alice"), &owner));
    }

    #[test]
    fn test_find_friend_by_username_or_title() {
        let friends = vec![user("bob", "b@x.com", "Bobby")];
        assert!(find_friend(&friends, "BOB").is_some());
        assert!(find_friend(&friends, "bobby").is_some());
        assert!(find_friend(&friends, "carol").is_none());
    }
}
