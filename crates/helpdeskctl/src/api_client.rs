//! API Client - JSON over HTTP to the ticketing backend
//!
//! Every call resolves to `Result<_, ApiError>`. Failures are logged here once
//! and handed back to the caller, which turns them into a user-facing notice.

use helpdesk_common::{
    ApiError, Comment, HelpdeskConfig, Identity, NewTicket, ReplyRequest, Ticket, TicketId,
};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, CONTENT_TYPE, COOKIE};
use reqwest::{Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::Serialize;

/// REST client bound to one backend origin
#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base: Url,
}

impl ApiClient {
    /// Build a client from configuration
    pub fn new(config: &HelpdeskConfig) -> anyhow::Result<Self> {
        let base = Url::parse(config.backend_base())
            .map_err(|e| anyhow::anyhow!("Invalid backend URL {}: {}", config.backend_url, e))?;

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        if let Some(cookie) = &config.session_cookie {
            let value = HeaderValue::from_str(cookie)
                .map_err(|_| anyhow::anyhow!("Session cookie contains invalid characters"))?;
            headers.insert(COOKIE, value);
        }

        let http = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .default_headers(headers)
            .build()
            .map_err(|e| anyhow::anyhow!("Failed to create HTTP client: {}", e))?;

        Ok(Self { http, base })
    }

    /// Backend-hosted login flow; a navigation target, not a JSON endpoint
    pub fn login_url(&self) -> String {
        self.url(&["api", "auth", "login"])
            .map(|u| u.to_string())
            .unwrap_or_else(|_| format!("{}/api/auth/login", self.base))
    }

    /// `GET /api/auth/me`
    pub async fn current_identity(&self) -> Result<Identity, ApiError> {
        self.get(&["api", "auth", "me"]).await
    }

    /// `GET /api/public/tickets`
    pub async fn list_tickets(&self) -> Result<Vec<Ticket>, ApiError> {
        self.get(&["api", "public", "tickets"]).await
    }

    /// `POST /api/public/tickets`
    pub async fn create_ticket(&self, ticket: &NewTicket) -> Result<Ticket, ApiError> {
        self.post(&["api", "public", "tickets"], ticket).await
    }

    /// `GET /api/public/tickets/{code}`
    pub async fn ticket_by_code(&self, code: &str) -> Result<Ticket, ApiError> {
        self.get(&["api", "public", "tickets", code]).await
    }

    /// `GET /api/agent/tickets/{id}`
    pub async fn ticket_detail(&self, id: TicketId) -> Result<Ticket, ApiError> {
        let id = id.to_string();
        self.get(&["api", "agent", "tickets", &id]).await
    }

    /// `GET /api/agent/tickets/{id}/comments`
    pub async fn ticket_comments(&self, id: TicketId) -> Result<Vec<Comment>, ApiError> {
        let id = id.to_string();
        self.get(&["api", "agent", "tickets", &id, "comments"]).await
    }

    /// Detail and comment history, fetched concurrently
    pub async fn ticket_with_comments(
        &self,
        id: TicketId,
    ) -> Result<(Ticket, Vec<Comment>), ApiError> {
        tokio::try_join!(self.ticket_detail(id), self.ticket_comments(id))
    }

    /// `POST /api/agent/tickets/{id}/reply`
    pub async fn reply(&self, id: TicketId, reply: &ReplyRequest) -> Result<(), ApiError> {
        let id = id.to_string();
        let url = self.url(&["api", "agent", "tickets", &id, "reply"])?;
        let response = self
            .http
            .post(url.clone())
            .json(reply)
            .send()
            .await
            .map_err(|e| transport_error(&url, e))?;
        check_status(&url, response).await.map(|_| ())
    }

    fn url(&self, segments: &[&str]) -> Result<Url, ApiError> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| ApiError::Transport(format!("Backend URL {} cannot take a path", self.base)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn get<T: DeserializeOwned>(&self, segments: &[&str]) -> Result<T, ApiError> {
        let url = self.url(segments)?;
        tracing::debug!("GET {}", url);
        let response = self
            .http
            .get(url.clone())
            .send()
            .await
            .map_err(|e| transport_error(&url, e))?;
        decode(&url, response).await
    }

    async fn post<B: Serialize, T: DeserializeOwned>(
        &self,
        segments: &[&str],
        body: &B,
    ) -> Result<T, ApiError> {
        let url = self.url(segments)?;
        tracing::debug!("POST {}", url);
        let response = self
            .http
            .post(url.clone())
            .json(body)
            .send()
            .await
            .map_err(|e| transport_error(&url, e))?;
        decode(&url, response).await
    }
}

fn transport_error(url: &Url, error: reqwest::Error) -> ApiError {
    let message = if error.is_timeout() {
        "request timed out".to_string()
    } else if error.is_connect() {
        format!("connection failed: {}", error)
    } else {
        error.to_string()
    };
    tracing::warn!("API error on {}: {}", url.path(), message);
    ApiError::Transport(message)
}

/// Map non-2xx statuses to `ApiError`, passing successful responses through
async fn check_status(url: &Url, response: Response) -> Result<Response, ApiError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        tracing::debug!("{} answered {}", url.path(), status);
        return Err(ApiError::Unauthorized(status.as_u16()));
    }

    let body = response.text().await.unwrap_or_default();
    let message = rejection_message(&body)
        .unwrap_or_else(|| status.canonical_reason().unwrap_or("error").to_string());
    tracing::warn!("API error on {}: {} {}", url.path(), status.as_u16(), message);
    Err(ApiError::Rejected {
        status: status.as_u16(),
        message,
    })
}

async fn decode<T: DeserializeOwned>(url: &Url, response: Response) -> Result<T, ApiError> {
    let response = check_status(url, response).await?;
    let bytes = response
        .bytes()
        .await
        .map_err(|e| transport_error(url, e))?;
    serde_json::from_slice(&bytes).map_err(|e| {
        tracing::warn!("Undecodable response from {}: {}", url.path(), e);
        ApiError::Decode(e.to_string())
    })
}

/// Pull `message` (or `error`) out of a JSON error body
fn rejection_message(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    ["message", "error"]
        .iter()
        .find_map(|key| value.get(*key).and_then(|v| v.as_str()))
        .filter(|message| !message.is_empty())
        .map(str::to_string)
}
