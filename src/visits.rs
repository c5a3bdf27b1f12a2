//! Landing page visit tracking.

use axum::extract::{ConnectInfo, Request, State};
use axum::http::header::USER_AGENT;
use axum::http::HeaderMap;
use axum::middleware::Next;
use axum::response::Response;
use std::net::SocketAddr;
use std::sync::Arc;

use crate::db::{visits, NewPageVisit};
use crate::state::AppState;

pub const LANDING_PAGE: &str = "/";

const BOT_MARKERS: &[&str] = &[
    "bot", "crawl", "spider", "slurp", "curl", "wget", "python", "java/", "fetcher",
];
const MAX_USER_AGENT_CHARS: usize = 500;

pub fn is_bot(user_agent: &str) -> bool {
    let user_agent = user_agent.to_ascii_lowercase();
    BOT_MARKERS.iter().any(|marker| user_agent.contains(marker))
}

/// First `x-forwarded-for` hop, then the socket peer.
fn client_ip(headers: &HeaderMap, peer: Option<SocketAddr>) -> String {
    headers
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(str::trim)
        .filter(|ip| !ip.is_empty())
        .map(str::to_string)
        .or_else(|| peer.map(|addr| addr.ip().to_string()))
        .unwrap_or_else(|| "unknown".to_string())
}

fn page_path(path: &str) -> String {
    let trimmed = path.trim_matches('/');
    if trimmed.is_empty() {
        LANDING_PAGE.to_string()
    } else {
        format!("/{}", trimmed)
    }
}

/// Middleware recording one visit per human request. Storage failures never
/// affect the response.
pub async fn track_visit(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Response {
    let user_agent = request
        .headers()
        .get(USER_AGENT)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default();

    if !is_bot(user_agent) {
        let peer = request
            .extensions()
            .get::<ConnectInfo<SocketAddr>>()
            .map(|info| info.0);
        let visit = NewPageVisit {
            ip_address: client_ip(request.headers(), peer),
            user_agent: Some(user_agent.chars().take(MAX_USER_AGENT_CHARS).collect()),
            page: page_path(request.uri().path()),
        };
        if let Err(err) = visits::record_visit(&state.pool, &visit).await {
            tracing::debug!(error = %err, "page visit not recorded");
        }
    }

    next.run(request).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn detects_bots_case_insensitively() {
        assert!(is_bot("Googlebot/2.1"));
        assert!(is_bot("curl/8.4.0"));
        assert!(is_bot("Python-urllib/3.11"));
        assert!(is_bot("Java/17.0.2"));
        assert!(!is_bot("Mozilla/5.0 (X11; Linux x86_64) Firefox/121.0"));
        assert!(!is_bot(""));
    }

    #[test]
    fn forwarded_header_wins_over_peer() {
        let peer: SocketAddr = "10.1.1.1:4000".parse().unwrap();
        let mut headers = HeaderMap::new();
        assert_eq!(client_ip(&headers, Some(peer)), "10.1.1.1");
        assert_eq!(client_ip(&headers, None), "unknown");
        headers.insert(
            "x-forwarded-for",
            HeaderValue::from_static("203.0.113.9, 10.0.0.2"),
        );
        assert_eq!(client_ip(&headers, Some(peer)), "203.0.113.9");
    }

    #[test]
    fn paths_are_normalised() {
        assert_eq!(page_path("/"), "/");
        assert_eq!(page_path("/about/"), "/about");
    }
}
