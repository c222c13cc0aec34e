use axum::extract::{Request, State};
use axum::http::StatusCode;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

use crate::state::AppState;

/// Rejects requests whose Host header is not on the trusted list. A `*`
/// entry disables the check.
pub async fn enforce_trusted_hosts(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let host = request
        .headers()
        .get(axum::http::header::HOST)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default();

    if host_is_trusted(host, &state.config.trusted_hosts) {
        next.run(request).await
    } else {
        tracing::warn!(host, "rejected request from untrusted host");
        (StatusCode::BAD_REQUEST, "Invalid host header").into_response()
    }
}

fn host_is_trusted(host: &str, trusted: &[String]) -> bool {
    if trusted.iter().any(|entry| entry.trim() == "*") {
        return true;
    }
    // Compare without the port.
    let hostname = host.rsplit_once(':').map_or(host, |(name, _)| name);
    let hostname = hostname.trim();
    !hostname.is_empty()
        && trusted
            .iter()
            .any(|entry| entry.trim().eq_ignore_ascii_case(hostname))
}

#[cfg(test)]
mod tests {
    use super::host_is_trusted;

    fn trusted() -> Vec<String> {
        vec!["localhost".to_string(), "api.rentdesk.in".to_string()]
    }

    #[test]
    fn matches_hostname_ignoring_port_and_case() {
        assert!(host_is_trusted("localhost:8000", &trusted()));
        assert!(host_is_trusted("API.Rentdesk.IN", &trusted()));
        assert!(!host_is_trusted("evil.example", &trusted()));
        assert!(!host_is_trusted("", &trusted()));
    }

    #[test]
    fn wildcard_disables_check() {
        assert!(host_is_trusted("anything", &["*".to_string()]));
    }
}
