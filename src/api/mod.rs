// API client module: a small blocking client for the package repository's
// mixed JSON-RPC / HTML-form interface. Reads go through `rpc.php` and come
// back as JSON envelopes; writes are form posts whose outcome is scraped
// from a redirect or the returned page.
//
// The client owns its transport and (optionally) an authenticated session.
// Each component lives in its own submodule and adds methods to `ApiClient`.

pub mod action;
pub mod download;
pub mod response;
pub mod search;
pub mod session;
pub mod transport;
pub mod upload;

pub use action::{Action, ActionOutcome};
pub use search::QueryKind;
pub use session::{CredentialPrompt, Session, SessionStore};
pub use transport::{HttpRequest, HttpResponse, HttpTransport, Method, Transport};
pub use upload::{CommentStatus, TarballSource, UploadOutcome, UploadRequest};

use crate::config::Config;
use crate::error::{AurError, Result};

/// Base origin of the public repository.
pub const DEFAULT_BASE_URL: &str = "https://aur.archlinux.org";

/// Client bound to one transport and at most one session.
pub struct ApiClient<T = HttpTransport> {
    transport: T,
    base_url: String,
    session: Option<Session>,
}

impl ApiClient<HttpTransport> {
    /// Create a client talking HTTP(S) to the configured origin.
    pub fn from_config(config: &Config) -> Result<Self> {
        let transport = HttpTransport::with_timeout(&config.user_agent, config.timeout)?;
        Ok(ApiClient::new(transport, config.base_url.clone()))
    }
}

impl<T: Transport> ApiClient<T> {
    pub fn new(transport: T, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        ApiClient {
            transport,
            base_url,
            session: None,
        }
    }

    pub fn with_session(mut self, session: Session) -> Self {
        self.session = Some(session);
        self
    }

    /// Replace the current session with a new one.
    pub fn set_session(&mut self, session: Session) {
        self.session = Some(session);
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Web page of a package, for display.
    pub fn package_page(&self, id: u64) -> String {
        self.url(&format!("/packages.php?ID={id}"))
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn require_session(&self) -> Result<&Session> {
        self.session
            .as_ref()
            .ok_or_else(|| AurError::Authentication("this action requires a login".into()))
    }

    fn with_cookie(&self, req: HttpRequest) -> HttpRequest {
        match &self.session {
            Some(session) => req.header("cookie", session.cookie()),
            None => req,
        }
    }

    fn get(&self, path: &str) -> Result<HttpResponse> {
        let req = self.with_cookie(HttpRequest::get(self.url(path)));
        self.transport.send(req)
    }

    /// POST an already-encoded `application/x-www-form-urlencoded` body.
    fn form_post(&self, path: &str, body: String) -> Result<HttpResponse> {
        let len = body.len();
        let req = HttpRequest::post(self.url(path), body.into_bytes())
            .header("content-type", "application/x-www-form-urlencoded")
            .header("content-length", len.to_string());
        self.transport.send(self.with_cookie(req))
    }
}

/// Percent-encode a form value; spaces become `+`.
pub(crate) fn form_value(value: &str) -> String {
    url::form_urlencoded::byte_serialize(value.as_bytes()).collect()
}
