use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};

use super::{de_lenient_string, de_lenient_u32, de_timestamp, id_from_href};

/// Symbols that mark an episode as readable by the current account on
/// legacy listings.
const READABLE_SYMBOLS: &[&str] = &["閲覧期限", "無料", "今なら無料"];

/// One entry of a series' episode listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EpisodeRef {
    pub id: String,
    #[serde(default)]
    pub href: String,
    pub title: String,
    #[serde(default, alias = "updateDate", alias = "updatedAt")]
    pub updated: String,
    #[serde(default, alias = "symbols")]
    pub access_symbols: Vec<String>,
    /// Reported directly by modern sites; inferred from symbols on legacy ones.
    #[serde(default)]
    pub has_access: Option<bool>,
}

impl EpisodeRef {
    pub fn from_href(href: impl Into<String>, title: impl Into<String>) -> Self {
        let href = href.into();
        Self {
            id: if href.is_empty() {
                String::new()
            } else {
                id_from_href(&href)
            },
            href,
            title: title.into(),
            updated: String::new(),
            access_symbols: Vec::new(),
            has_access: None,
        }
    }

    pub fn is_downloadable(&self) -> bool {
        if let Some(has_access) = self.has_access {
            return has_access && !self.id.is_empty();
        }
        if self.href.is_empty() {
            return false;
        }
        self.access_symbols
            .first()
            .and_then(|symbol| symbol.lines().next())
            .map(|first| READABLE_SYMBOLS.contains(&first.trim()))
            .unwrap_or(false)
    }
}

/// Series-level metadata from the `book/Info` endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct BookInfo {
    #[serde(deserialize_with = "de_lenient_string")]
    pub id: String,
    pub title: String,
    #[serde(default, deserialize_with = "de_lenient_string")]
    pub thumb_image_url: String,
    #[serde(default, deserialize_with = "de_lenient_string")]
    pub description: String,
    #[serde(default, deserialize_with = "de_timestamp")]
    pub publish_date: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "de_timestamp")]
    pub end_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub authors: Option<String>,
}

/// Per-episode metadata from `book/episodeInfo`. `id` is the viewer id.
#[derive(Debug, Clone, Deserialize)]
pub struct EpisodeInfo {
    #[serde(deserialize_with = "de_lenient_string")]
    pub id: String,
    pub name: String,
    #[serde(default, deserialize_with = "de_lenient_string")]
    pub description: String,
    #[serde(default, deserialize_with = "de_lenient_string")]
    pub thumb_image_url: String,
    #[serde(deserialize_with = "de_lenient_u32")]
    pub page_count: u32,
    #[serde(default, deserialize_with = "de_lenient_string")]
    pub episode_number: String,
    #[serde(default, deserialize_with = "de_timestamp")]
    pub publish_date: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "de_timestamp")]
    pub end_date: Option<DateTime<Utc>>,
}

impl EpisodeInfo {
    /// End dates far in the future mean the episode never leaves the store.
    pub fn open_ended(&self) -> bool {
        self.end_date.map(|d| d.year() >= 9999).unwrap_or(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn legacy_ref(symbols: &[&str]) -> EpisodeRef {
        let mut ep = EpisodeRef::from_href("/episodes/abcdef1234567", "Ep 1");
        ep.access_symbols = symbols.iter().map(|s| s.to_string()).collect();
        ep
    }

    #[test]
    fn test_legacy_access_inferred_from_symbols() {
        assert!(legacy_ref(&["無料"]).is_downloadable());
        assert!(legacy_ref(&["閲覧期限\n2024/01/01まで"]).is_downloadable());
        assert!(!legacy_ref(&["100pt"]).is_downloadable());
        assert!(!legacy_ref(&[]).is_downloadable());
    }

    #[test]
    fn test_legacy_access_requires_href() {
        let mut ep = EpisodeRef::from_href("", "Locked");
        ep.access_symbols = vec!["無料".into()];
        assert!(!ep.is_downloadable());
    }

    #[test]
    fn test_modern_flag_wins_over_symbols() {
        let mut ep = legacy_ref(&["無料"]);
        ep.has_access = Some(false);
        assert!(!ep.is_downloadable());

        let mut ep = legacy_ref(&[]);
        ep.has_access = Some(true);
        assert!(ep.is_downloadable());
    }

    #[test]
    fn test_episode_info_lenient_fields() {
        let json = r#"{
            "id": "0123456789abcdef0123456789abcdef",
            "name": "第1話",
            "description": null,
            "thumb_image_url": "",
            "page_count": "24",
            "episode_number": 1,
            "publish_date": "2024-01-01T00:00:00+09:00",
            "end_date": "9999-12-31T23:59:59+09:00"
        }"#;
        let info: EpisodeInfo = serde_json::from_str(json).unwrap();
        assert_eq!(info.page_count, 24);
        assert_eq!(info.episode_number, "1");
        assert_eq!(info.description, "");
        assert!(info.open_ended());
    }
}
