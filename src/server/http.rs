//! HTTP server implementation
//!
//! hyper http1 with TokioIo for async handling. All routing happens in
//! one `(method, path)` dispatcher; handlers live in `routes::*`.

use bytes::Bytes;
use http_body_util::Full;
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tokio::net::TcpListener;
use tracing::{error, info};

use crate::account::AccountClient;
use crate::config::Args;
use crate::groupware::GroupwareClient;
use crate::identity::Identity;
use crate::routes;
use crate::types::SanctumError;

/// Shared application state. No mutable state lives here: every request
/// reads through to the upstreams, so requests never contend.
pub struct AppState {
    pub args: Args,
    pub groupware: GroupwareClient,
    pub account: AccountClient,
    pub started: Instant,
}

impl AppState {
    pub fn new(args: Args) -> Self {
        let groupware = GroupwareClient::new(&args);
        let account = AccountClient::new(&args);
        Self {
            args,
            groupware,
            account,
            started: Instant::now(),
        }
    }
}

/// Start the HTTP server
pub async fn run(state: Arc<AppState>) -> Result<(), SanctumError> {
    let listener = TcpListener::bind(state.args.listen).await?;

    info!(
        "Sanctum listening on {} as node {}",
        state.args.listen, state.args.node_id
    );

    loop {
        match listener.accept().await {
            Ok((stream, addr)) => {
                let state = Arc::clone(&state);
                tokio::spawn(async move {
                    let io = TokioIo::new(stream);

                    let service = service_fn(move |req| {
                        let state = Arc::clone(&state);
                        async move { handle_request(state, addr, req).await }
                    });

                    if let Err(err) = http1::Builder::new()
                        .serve_connection(io, service)
                        .await
                    {
                        error!("Error serving connection from {}: {:?}", addr, err);
                    }
                });
            }
            Err(e) => {
                error!("Error accepting connection: {:?}", e);
            }
        }
    }
}

/// Route incoming HTTP requests
async fn handle_request(
    state: Arc<AppState>,
    addr: SocketAddr,
    req: Request<Incoming>,
) -> Result<Response<Full<Bytes>>, hyper::Error> {
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let params = routes::parse_query_params(req.uri().query().unwrap_or(""));
    let identity = Identity::from_headers(req.headers());

    info!("[{}] {} {}", addr, method, path);

    let response = match (method, path.as_str()) {
        // Probes
        (Method::GET, "/health") | (Method::GET, "/healthz") => {
            routes::health::health_check(state)
        }
        (Method::GET, "/ready") | (Method::GET, "/readyz") => {
            routes::health::readiness_check(state)
        }
        (Method::GET, "/version") => routes::health::version_info(),

        // CORS preflight
        (Method::OPTIONS, _) => preflight_response(),

        // Identity
        (Method::GET, "/userinfo") => routes::userinfo::handle_userinfo(identity),

        // ====================================================================
        // Guilds
        // ====================================================================
        (Method::GET, "/guilds") => {
            routes::guilds::handle_list_guilds(state, identity).await
        }
        (Method::GET, "/guilds/mine") => {
            routes::guilds::handle_my_guilds(state, identity).await
        }
        (Method::POST, "/guilds") => {
            routes::guilds::handle_create_guild(req, state, identity).await
        }
        (Method::GET, p) if p.starts_with("/guilds/") => {
            let rest = p.strip_prefix("/guilds/").unwrap_or("");
            match rest.split_once('/') {
                None if !rest.is_empty() => {
                    routes::guilds::handle_get_guild(state, identity, rest).await
                }
                Some((guild_id, "focus")) => {
                    routes::guilds::handle_guild_focus(state, identity, guild_id).await
                }
                Some((guild_id, "notifications")) => {
                    routes::guilds::handle_guild_notifications(state, identity, guild_id).await
                }
                _ => not_found_response(&path),
            }
        }
        (Method::POST, p) if p.starts_with("/guilds/") => {
            let guild_id = p.strip_prefix("/guilds/").unwrap_or("");
            if guild_id.is_empty() || guild_id.contains('/') {
                not_found_response(&path)
            } else {
                routes::guilds::handle_guild_action(state, identity, guild_id, &params).await
            }
        }
        (Method::PUT, p) if p.starts_with("/guilds/") => {
            let guild_id = p.strip_prefix("/guilds/").unwrap_or("").to_string();
            if guild_id.is_empty() || guild_id.contains('/') {
                not_found_response(&path)
            } else {
                routes::guilds::handle_update_guild(req, state, identity, &guild_id).await
            }
        }

        // ====================================================================
        // Calendar (rites)
        // ====================================================================
        (Method::GET, p) if p.starts_with("/calendar/") => {
            match calendar_route(p) {
                Some((calendar_uri, None)) => {
                    routes::calendar::handle_list_events(state, identity, calendar_uri).await
                }
                _ => not_found_response(&path),
            }
        }
        (Method::POST, p) if p.starts_with("/calendar/") => {
            match calendar_route(p).map(|(c, e)| (c.to_string(), e.map(str::to_string))) {
                Some((calendar_uri, None)) => {
                    routes::calendar::handle_create_event(req, state, identity, &calendar_uri)
                        .await
                }
                _ => not_found_response(&path),
            }
        }
        (Method::PUT, p) if p.starts_with("/calendar/") => {
            match calendar_route(p).map(|(c, e)| (c.to_string(), e.map(str::to_string))) {
                Some((calendar_uri, Some(event_uid))) => {
                    routes::calendar::handle_update_event(
                        req,
                        state,
                        identity,
                        &calendar_uri,
                        &event_uid,
                    )
                    .await
                }
                _ => not_found_response(&path),
            }
        }
        (Method::DELETE, p) if p.starts_with("/calendar/") => {
            match calendar_route(p) {
                Some((calendar_uri, Some(event_uid))) => {
                    routes::calendar::handle_delete_event(state, identity, calendar_uri, event_uid)
                        .await
                }
                _ => not_found_response(&path),
            }
        }

        // ====================================================================
        // Chat (pulse)
        // ====================================================================
        (Method::GET, "/talk/rooms") => {
            routes::talk::handle_list_rooms(state, identity).await
        }
        (Method::GET, p) if p.starts_with("/talk/rooms/") && p.ends_with("/messages") => {
            let token = p
                .strip_prefix("/talk/rooms/")
                .and_then(|s| s.strip_suffix("/messages"))
                .unwrap_or("");
            routes::talk::handle_get_messages(state, identity, token, &params).await
        }
        (Method::POST, p) if p.starts_with("/talk/rooms/") && p.ends_with("/messages") => {
            let token = p
                .strip_prefix("/talk/rooms/")
                .and_then(|s| s.strip_suffix("/messages"))
                .unwrap_or("")
                .to_string();
            routes::talk::handle_send_message(req, state, identity, &token).await
        }
        (Method::POST, p) if p.starts_with("/talk/") && p.ends_with("/upload") => {
            let token = p
                .strip_prefix("/talk/")
                .and_then(|s| s.strip_suffix("/upload"))
                .unwrap_or("")
                .to_string();
            routes::talk::handle_upload(req, state, identity, &token).await
        }

        // ====================================================================
        // Kanban (quests)
        // ====================================================================
        (Method::GET, p) if p.starts_with("/deck/") && p.ends_with("/stacks") => {
            let board = p
                .strip_prefix("/deck/")
                .and_then(|s| s.strip_suffix("/stacks"))
                .and_then(|s| s.parse::<i64>().ok());
            match board {
                Some(board_id) => {
                    routes::deck::handle_get_stacks(state, identity, board_id).await
                }
                None => not_found_response(&path),
            }
        }
        (Method::POST, p) if p.starts_with("/deck/") && p.ends_with("/cards") => {
            match deck_cards_route(p) {
                Some((board_id, stack_id)) => {
                    routes::deck::handle_create_card(req, state, identity, board_id, stack_id)
                        .await
                }
                None => not_found_response(&path),
            }
        }

        // ====================================================================
        // Files (archive)
        // ====================================================================
        (Method::DELETE, p) if p.starts_with("/files/delete/") => {
            match p.strip_prefix("/files/delete/").unwrap_or("").parse::<i64>() {
                Ok(file_id) => {
                    routes::files::handle_delete_file(state, identity, file_id).await
                }
                Err(_) => not_found_response(&path),
            }
        }
        (Method::GET, p) if p.starts_with("/files/") => {
            match p.strip_prefix("/files/").unwrap_or("").parse::<i64>() {
                Ok(folder_id) => {
                    routes::files::handle_list_files(state, identity, folder_id).await
                }
                Err(_) => not_found_response(&path),
            }
        }
        (Method::POST, p) if p.starts_with("/files/") && p.ends_with("/folder") => {
            let folder = p
                .strip_prefix("/files/")
                .and_then(|s| s.strip_suffix("/folder"))
                .and_then(|s| s.parse::<i64>().ok());
            match folder {
                Some(folder_id) => {
                    routes::files::handle_create_folder(req, state, identity, folder_id).await
                }
                None => not_found_response(&path),
            }
        }
        (Method::POST, p) if p.starts_with("/files/") => {
            match p.strip_prefix("/files/").unwrap_or("").parse::<i64>() {
                Ok(folder_id) => {
                    routes::files::handle_upload_file(req, state, identity, folder_id).await
                }
                Err(_) => not_found_response(&path),
            }
        }

        // ====================================================================
        // Forms (scrolls)
        // ====================================================================
        (Method::GET, "/forms") => routes::forms::handle_list_forms(state, identity).await,
        (Method::GET, "/forms/shared") => {
            routes::forms::handle_shared_forms(state, identity).await
        }
        (Method::POST, "/forms") => {
            routes::forms::handle_create_form(req, state, identity).await
        }

        // ====================================================================
        // Avatars
        // ====================================================================
        (Method::GET, p) if p.starts_with("/avatar/") => {
            let rest = p.strip_prefix("/avatar/").unwrap_or("");
            match rest.split_once('/') {
                Some((username, size)) if !username.is_empty() && !size.contains('/') => {
                    routes::avatar::handle_avatar(state, identity, username, size).await
                }
                _ => not_found_response(&path),
            }
        }

        // ====================================================================
        // Account service
        // ====================================================================
        (Method::DELETE, "/account") => {
            routes::account::handle_delete_account(req, state, identity).await
        }
        (Method::GET, "/invite") => {
            routes::account::handle_invite_link(state, identity).await
        }
        (Method::GET, "/invite/referrals") => {
            routes::account::handle_referrals(state, identity).await
        }

        _ => not_found_response(&path),
    };

    Ok(response)
}

/// Parse /calendar/{calendarId}/events[/{eventUid}]
fn calendar_route(path: &str) -> Option<(&str, Option<&str>)> {
    let rest = path.strip_prefix("/calendar/")?;
    let (calendar_uri, tail) = rest.split_once('/')?;
    if calendar_uri.is_empty() {
        return None;
    }
    match tail {
        "events" => Some((calendar_uri, None)),
        _ => {
            let event_uid = tail.strip_prefix("events/")?;
            if event_uid.is_empty() || event_uid.contains('/') {
                return None;
            }
            Some((calendar_uri, Some(event_uid)))
        }
    }
}

/// Parse /deck/{boardId}/stacks/{stackId}/cards
fn deck_cards_route(path: &str) -> Option<(i64, i64)> {
    let rest = path.strip_prefix("/deck/")?;
    let (board, tail) = rest.split_once('/')?;
    let board_id = board.parse::<i64>().ok()?;
    let stack = tail.strip_prefix("stacks/")?.strip_suffix("/cards")?;
    if stack.contains('/') {
        return None;
    }
    let stack_id = stack.parse::<i64>().ok()?;
    Some((board_id, stack_id))
}

fn not_found_response(path: &str) -> Response<Full<Bytes>> {
    routes::error_response(StatusCode::NOT_FOUND, &format!("Not found: {}", path))
}

fn preflight_response() -> Response<Full<Bytes>> {
    Response::builder()
        .status(StatusCode::NO_CONTENT)
        .header("Access-Control-Allow-Origin", "*")
        .header(
            "Access-Control-Allow-Methods",
            "GET, POST, PUT, DELETE, OPTIONS",
        )
        .header("Access-Control-Allow-Headers", "Content-Type")
        .header("Access-Control-Max-Age", "86400")
        .body(Full::new(Bytes::new()))
        .unwrap()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_calendar_route_events() {
        assert_eq!(
            calendar_route("/calendar/cal-1/events"),
            Some(("cal-1", None))
        );
        assert_eq!(
            calendar_route("/calendar/cal-1/events/uid-9"),
            Some(("cal-1", Some("uid-9")))
        );
        assert_eq!(calendar_route("/calendar/cal-1"), None);
        assert_eq!(calendar_route("/calendar//events"), None);
        assert_eq!(calendar_route("/calendar/cal-1/events/a/b"), None);
    }

    #[test]
    fn test_deck_cards_route() {
        assert_eq!(deck_cards_route("/deck/4/stacks/7/cards"), Some((4, 7)));
        assert_eq!(deck_cards_route("/deck/4/stacks/cards"), None);
        assert_eq!(deck_cards_route("/deck/x/stacks/7/cards"), None);
    }

    #[test]
    fn test_not_found_response() {
        let resp = not_found_response("/nope");
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }
}
