//! Per-session site state and protocol detection.

pub mod envelope;
pub(crate) mod markup;
pub mod probe;

pub use probe::{detect, detect_document};

use std::fmt;
use std::sync::Mutex;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::app::Result;

/// The two backend generations a Comici-powered site may speak.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SiteProtocol {
    /// Server-rendered HTML listings and `/book/*` JSON endpoints
    Legacy,
    /// JSON `/api/*` endpoints throughout
    Modern,
}

impl fmt::Display for SiteProtocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SiteProtocol::Legacy => write!(f, "legacy"),
            SiteProtocol::Modern => write!(f, "modern"),
        }
    }
}

/// State shared by every call against one site. The protocol is fixed at
/// construction; the user id accumulates from responses.
#[derive(Debug)]
pub struct Session {
    host: Url,
    protocol: SiteProtocol,
    user_id: Mutex<Option<String>>,
}

impl Session {
    pub fn new(host: Url, protocol: SiteProtocol) -> Self {
        Self {
            host,
            protocol,
            user_id: Mutex::new(None),
        }
    }

    pub fn host(&self) -> &Url {
        &self.host
    }

    pub fn protocol(&self) -> SiteProtocol {
        self.protocol
    }

    pub fn endpoint(&self, path: &str) -> Result<Url> {
        Ok(self.host.join(path)?)
    }

    /// `https://host` without a trailing slash, as sent in `Origin`.
    pub fn origin(&self) -> String {
        self.host.origin().ascii_serialization()
    }

    pub fn episode_page(&self, episode_id: &str) -> Result<Url> {
        self.endpoint(&format!("/episodes/{}/", episode_id))
    }

    pub fn user_id(&self) -> Option<String> {
        self.user_id
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Remember the logged-in user id if the page exposed one.
    pub fn record_user_id(&self, user_id: &str) {
        let user_id = user_id.trim();
        if user_id.is_empty() {
            return;
        }
        let mut current = self.user_id.lock().unwrap_or_else(|e| e.into_inner());
        if current.as_deref() != Some(user_id) {
            tracing::debug!("Logged in as user {}", user_id);
            *current = Some(user_id.to_string());
        }
    }

    /// User id to send with content requests; "0" means anonymous.
    pub fn effective_user_id(&self, explicit: Option<&str>) -> String {
        explicit
            .filter(|id| !id.is_empty() && *id != "0")
            .map(String::from)
            .or_else(|| self.user_id())
            .unwrap_or_else(|| "0".to_string())
    }

    #[cfg(test)]
    pub(crate) fn for_tests(protocol: SiteProtocol) -> Self {
        Self::new(Url::parse("https://comic.example").unwrap(), protocol)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_and_origin() {
        let session = Session::for_tests(SiteProtocol::Legacy);
        assert_eq!(
            session.endpoint("/book/Info").unwrap().as_str(),
            "https://comic.example/book/Info"
        );
        assert_eq!(session.origin(), "https://comic.example");
        assert_eq!(
            session.episode_page("abc").unwrap().as_str(),
            "https://comic.example/episodes/abc/"
        );
    }

    #[test]
    fn test_user_id_accumulates() {
        let session = Session::for_tests(SiteProtocol::Legacy);
        assert_eq!(session.user_id(), None);
        assert_eq!(session.effective_user_id(None), "0");

        session.record_user_id("   ");
        assert_eq!(session.user_id(), None);

        session.record_user_id("12345");
        assert_eq!(session.effective_user_id(None), "12345");
        assert_eq!(session.effective_user_id(Some("0")), "12345");
        assert_eq!(session.effective_user_id(Some("999")), "999");
    }
}
