// Session handling: logging in, and deciding which session a write request
// should use. Persisting cookies and prompting for credentials belong to the
// caller and are reached through the `SessionStore` / `CredentialPrompt`
// traits.

use super::transport::Transport;
use super::{form_value, ApiClient};
use crate::error::{AurError, Result};
use std::path::Path;
use tracing::{debug, info, warn};

/// Substring every usable session cookie contains.
pub const SESSION_MARKER: &str = "AURSID=";

/// An authenticated session: the raw cookie text the service handed out.
/// Sessions are never edited; a new login yields a new value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    cookie: String,
    username: Option<String>,
}

impl Session {
    /// Wrap a cookie the caller vouches for.
    pub fn supplied(cookie: impl Into<String>) -> Self {
        Session {
            cookie: cookie.into(),
            username: None,
        }
    }

    fn logged_in(cookie: String, username: &str) -> Self {
        Session {
            cookie,
            username: Some(username.to_string()),
        }
    }

    pub fn cookie(&self) -> &str {
        &self.cookie
    }

    /// Account name, known only when the session came from `login`.
    pub fn username(&self) -> Option<&str> {
        self.username.as_deref()
    }
}

/// Where a previous session's cookie is kept between runs.
pub trait SessionStore {
    fn load(&self) -> Option<String>;
    fn save(&self, cookie: &str) -> std::io::Result<()>;
}

/// Asks the user for whatever credentials were not given up front.
pub trait CredentialPrompt {
    fn username(&self) -> anyhow::Result<String>;
    fn password(&self, username: &str) -> anyhow::Result<String>;
}

impl<T: Transport> ApiClient<T> {
    /// Log in with a form post. Returns `None` when the service does not
    /// answer with both a redirect and a cookie.
    pub fn login(&self, username: &str, password: &str) -> Result<Option<Session>> {
        let body = format!("user={}&passwd={}", form_value(username), form_value(password));
        let res = self.form_post("/index.php", body)?;
        match res.header("set-cookie") {
            Some(cookie) if res.is_redirect() => {
                info!(user = username, "logged in");
                Ok(Some(Session::logged_in(cookie.to_string(), username)))
            }
            _ => {
                debug!(status = res.status, "login rejected");
                Ok(None)
            }
        }
    }

    /// Pick the session for a write request.
    ///
    /// 1. A supplied cookie without a username is used as is when it
    ///    contains the session marker, otherwise it is read as a path to a
    ///    cookie file.
    /// 2. Without a username, a session saved by an earlier run is reused.
    /// 3. Otherwise log in afresh. An explicit username always forces a new
    ///    login, even if a cookie was supplied too.
    pub fn resolve_session(
        &self,
        supplied_cookie: Option<&str>,
        username: Option<&str>,
        password: Option<&str>,
        store: &dyn SessionStore,
        prompt: &dyn CredentialPrompt,
    ) -> Result<Session> {
        if username.is_none() {
            if let Some(cookie) = supplied_cookie {
                return supplied_session(cookie);
            }
            if let Some(cookie) = store.load().filter(|c| !c.trim().is_empty()) {
                debug!("reusing stored session");
                return Ok(Session::supplied(cookie.trim()));
            }
            warn!("no stored session, asking for credentials");
        }

        let username = match username {
            Some(user) => user.to_string(),
            None => prompt
                .username()
                .map_err(|e| AurError::Authentication(e.to_string()))?,
        };
        let password = match password {
            Some(pass) => pass.to_string(),
            None => prompt
                .password(&username)
                .map_err(|e| AurError::Authentication(e.to_string()))?,
        };

        self.login(&username, &password)?
            .ok_or_else(|| AurError::Authentication(format!("login rejected for {username}")))
    }
}

fn supplied_session(cookie: &str) -> Result<Session> {
    if cookie.contains(SESSION_MARKER) {
        return Ok(Session::supplied(cookie));
    }
    match std::fs::read_to_string(Path::new(cookie)) {
        Ok(text) if !text.trim().is_empty() => Ok(Session::supplied(text.trim())),
        Ok(_) => Err(AurError::Authentication(format!(
            "cookie file {cookie} is empty"
        ))),
        Err(e) => {
            warn!(cookie, error = %e, "supplied cookie is neither a session nor a readable file");
            Err(AurError::Authentication(format!(
                "unusable cookie '{cookie}'"
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::testing::ScriptedTransport;
    use crate::api::transport::HttpResponse;
    use crate::api::DEFAULT_BASE_URL;
    use std::cell::RefCell;
    use std::io::Write;
    use std::sync::{Arc, Mutex};
    use tracing_subscriber::fmt::MakeWriter;

    /// Log sink shared between a test and its subscriber.
    #[derive(Clone, Default)]
    struct Logs(Arc<Mutex<Vec<u8>>>);

    impl Logs {
        fn text(&self) -> String {
            String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
        }
    }

    impl Write for Logs {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl<'a> MakeWriter<'a> for Logs {
        type Writer = Logs;

        fn make_writer(&'a self) -> Self::Writer {
            self.clone()
        }
    }

    struct MemoryStore(RefCell<Option<String>>);

    impl SessionStore for MemoryStore {
        fn load(&self) -> Option<String> {
            self.0.borrow().clone()
        }

        fn save(&self, cookie: &str) -> std::io::Result<()> {
            *self.0.borrow_mut() = Some(cookie.to_string());
            Ok(())
        }
    }

    struct FixedPrompt;

    impl CredentialPrompt for FixedPrompt {
        fn username(&self) -> anyhow::Result<String> {
            Ok("prompted".into())
        }

        fn password(&self, _username: &str) -> anyhow::Result<String> {
            Ok("secret".into())
        }
    }

    fn accepted() -> HttpResponse {
        HttpResponse::new(302)
            .with_header("set-cookie", "AURSID=fresh; path=/")
            .with_header("location", "index.php")
    }

    fn client(responses: Vec<HttpResponse>) -> ApiClient<ScriptedTransport> {
        ApiClient::new(ScriptedTransport::new(responses), DEFAULT_BASE_URL)
    }

    fn empty_store() -> MemoryStore {
        MemoryStore(RefCell::new(None))
    }

    #[test]
    fn login_posts_form_and_keeps_cookie() {
        let api = client(vec![accepted()]);
        let session = api.login("joe", "p w").unwrap().unwrap();
        assert_eq!(session.cookie(), "AURSID=fresh; path=/");
        assert_eq!(session.username(), Some("joe"));

        let sent = &api.transport().requests()[0];
        assert_eq!(sent.url, format!("{DEFAULT_BASE_URL}/index.php"));
        assert_eq!(sent.body_text(), "user=joe&passwd=p+w");
    }

    #[test]
    fn login_without_redirect_is_rejected() {
        let api = client(vec![HttpResponse::new(200).with_header("set-cookie", "AURSID=x")]);
        assert_eq!(api.login("joe", "bad").unwrap(), None);

        let api = client(vec![HttpResponse::new(302)]);
        assert_eq!(api.login("joe", "bad").unwrap(), None);
    }

    #[test]
    fn supplied_cookie_is_returned_unchanged() {
        let api = client(vec![]);
        let session = api
            .resolve_session(Some("AURSID=abc123"), None, None, &empty_store(), &FixedPrompt)
            .unwrap();
        assert_eq!(session.cookie(), "AURSID=abc123");
        assert!(api.transport().requests().is_empty());
    }

    #[test]
    fn supplied_cookie_may_be_a_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "AURSID=fromfile").unwrap();
        let path = file.path().to_str().unwrap().to_string();

        let api = client(vec![]);
        let session = api
            .resolve_session(Some(&path), None, None, &empty_store(), &FixedPrompt)
            .unwrap();
        assert_eq!(session.cookie(), "AURSID=fromfile");
    }

    #[test]
    fn unusable_cookie_is_an_authentication_error() {
        let api = client(vec![]);
        let err = api
            .resolve_session(
                Some("/no/such/cookie/file"),
                None,
                None,
                &empty_store(),
                &FixedPrompt,
            )
            .unwrap_err();
        assert!(matches!(err, AurError::Authentication(_)));
    }

    #[test]
    fn explicit_username_forces_fresh_login() {
        let api = client(vec![accepted()]);
        let session = api
            .resolve_session(
                Some("AURSID=stale"),
                Some("joe"),
                Some("pw"),
                &empty_store(),
                &FixedPrompt,
            )
            .unwrap();
        assert_eq!(session.cookie(), "AURSID=fresh; path=/");
        assert_eq!(api.transport().requests().len(), 1);
    }

    #[test]
    fn stored_session_is_reused_without_username() {
        let store = MemoryStore(RefCell::new(Some("AURSID=saved\n".into())));
        let api = client(vec![]);
        let session = api
            .resolve_session(None, None, None, &store, &FixedPrompt)
            .unwrap();
        assert_eq!(session.cookie(), "AURSID=saved");
    }

    #[test]
    fn prompts_when_nothing_is_stored() {
        let logs = Logs::default();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(logs.clone())
            .with_ansi(false)
            .finish();
        let api = client(vec![accepted()]);
        let session = tracing::subscriber::with_default(subscriber, || {
            api.resolve_session(None, None, None, &empty_store(), &FixedPrompt)
        })
        .unwrap();
        assert_eq!(session.username(), Some("prompted"));
        assert!(logs.text().contains("no stored session"));
        assert_eq!(
            api.transport().requests()[0].body_text(),
            "user=prompted&passwd=secret"
        );
    }

    #[test]
    fn rejected_login_is_an_authentication_error() {
        let api = client(vec![HttpResponse::new(200)]);
        let err = api
            .resolve_session(None, Some("joe"), Some("bad"), &empty_store(), &FixedPrompt)
            .unwrap_err();
        assert!(matches!(err, AurError::Authentication(_)));
    }
}
