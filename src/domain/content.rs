use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::app::{ComiciError, Result};

/// Opaque content-session handle for one episode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewerHandle {
    pub viewer_id: String,
    /// Human-facing episode id, needed for the image Referer.
    pub episode_id: Option<String>,
    /// Only modern sites hand this out; it keys the access check.
    pub series_id: Option<String>,
}

impl ViewerHandle {
    pub fn new(viewer_id: impl Into<String>) -> Self {
        Self {
            viewer_id: viewer_id.into(),
            episode_id: None,
            series_id: None,
        }
    }

    /// Id used in the episode page URL for Referer headers.
    pub fn referer_id(&self) -> &str {
        self.episode_id.as_deref().unwrap_or(&self.viewer_id)
    }
}

/// One rendered page with its single-use image URL.
#[derive(Debug, Clone, PartialEq)]
pub struct ContentPage {
    pub image_url: String,
    pub scramble: Vec<u32>,
    pub sort: u32,
    pub width: u32,
    pub height: u32,
    pub expires_at: DateTime<Utc>,
}

impl ContentPage {
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

/// Result of resolving one page of an episode.
#[derive(Debug, Clone, PartialEq)]
pub enum PageOutcome {
    Available(ContentPage),
    Denied { sort: u32 },
}

impl PageOutcome {
    pub fn sort(&self) -> u32 {
        match self {
            PageOutcome::Available(page) => page.sort,
            PageOutcome::Denied { sort } => *sort,
        }
    }
}

/// Wire form of a `contentsInfo` entry.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RawContentPage {
    pub image_url: String,
    pub scramble: serde_json::Value,
    pub sort: u32,
    #[serde(default)]
    pub width: u32,
    #[serde(default)]
    pub height: u32,
    pub expires_on: i64,
}

impl TryFrom<RawContentPage> for ContentPage {
    type Error = ComiciError;

    fn try_from(raw: RawContentPage) -> Result<Self> {
        // Scramble arrives as a JSON-encoded string on every site seen so far,
        // but accept a bare array too.
        let scramble: Vec<u32> = match raw.scramble {
            serde_json::Value::String(s) => serde_json::from_str(&s)?,
            other => serde_json::from_value(other)?,
        };
        let expires_at = DateTime::from_timestamp_millis(raw.expires_on).ok_or_else(|| {
            ComiciError::Markup(format!("invalid expiresOn {}", raw.expires_on))
        })?;

        Ok(Self {
            image_url: raw.image_url,
            scramble,
            sort: raw.sort,
            width: raw.width,
            height: raw.height,
            expires_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_raw_content_page_decodes_string_scramble() {
        let json = r#"{
            "imageUrl": "https://cdn.example.com/a.jpg?sig=1",
            "scramble": "[2, 0, 3, 1]",
            "sort": 0,
            "width": 800,
            "height": 1200,
            "expiresOn": 1700000000000
        }"#;
        let raw: RawContentPage = serde_json::from_str(json).unwrap();
        let page = ContentPage::try_from(raw).unwrap();
        assert_eq!(page.scramble, vec![2, 0, 3, 1]);
        assert_eq!(page.expires_at.timestamp(), 1_700_000_000);
    }

    #[test]
    fn test_raw_content_page_accepts_array() {
        let json = r#"{"imageUrl":"u","scramble":[0,1,2,3],"sort":5,"expiresOn":0}"#;
        let raw: RawContentPage = serde_json::from_str(json).unwrap();
        let page = ContentPage::try_from(raw).unwrap();
        assert_eq!(page.scramble.len(), 4);
        assert_eq!(page.sort, 5);
    }

    #[test]
    fn test_expiry() {
        let now = Utc::now();
        let page = ContentPage {
            image_url: "u".into(),
            scramble: vec![0],
            sort: 0,
            width: 1,
            height: 1,
            expires_at: now + Duration::minutes(5),
        };
        assert!(!page.is_expired_at(now));
        assert!(page.is_expired_at(now + Duration::minutes(5)));
    }

    #[test]
    fn test_referer_id_prefers_episode() {
        let mut handle = ViewerHandle::new("viewer");
        assert_eq!(handle.referer_id(), "viewer");
        handle.episode_id = Some("episode".into());
        assert_eq!(handle.referer_id(), "episode");
    }
}
