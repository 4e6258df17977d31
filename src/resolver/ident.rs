use url::Url;

use crate::app::{ComiciError, Result};
use crate::domain::id_from_href;

const EPISODE_ID_LEN: usize = 13;
const VIEWER_ID_LEN: usize = 32;
const SERIES_ID_LEN: usize = 13;

/// What the user pointed at when asking for an episode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EpisodeIdent {
    /// Public episode id from `/episodes/{id}/`
    Episode(String),
    /// Content-session id, usable as is
    Viewer(String),
}

impl EpisodeIdent {
    /// Accept a bare episode id, a bare viewer id, or an episode URL on `host`.
    pub fn parse(input: &str, host: &Url) -> Result<Self> {
        let input = input.trim();
        if let Some(ident) = Self::from_bare(input) {
            return Ok(ident);
        }
        let id = id_from_host_url(input, host)?;
        Self::from_bare(&id).ok_or_else(|| ComiciError::InvalidIdentifier(input.to_string()))
    }

    fn from_bare(id: &str) -> Option<Self> {
        if !is_plain_id(id) {
            return None;
        }
        match id.len() {
            EPISODE_ID_LEN => Some(EpisodeIdent::Episode(id.to_string())),
            VIEWER_ID_LEN => Some(EpisodeIdent::Viewer(id.to_string())),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            EpisodeIdent::Episode(id) | EpisodeIdent::Viewer(id) => id,
        }
    }
}

/// Accept a bare series id or a series URL on `host`.
pub fn parse_series_id(input: &str, host: &Url) -> Result<String> {
    let input = input.trim();
    if input.len() == SERIES_ID_LEN && is_plain_id(input) {
        return Ok(input.to_string());
    }
    let id = id_from_host_url(input, host)?;
    if id.len() == SERIES_ID_LEN && is_plain_id(&id) {
        Ok(id)
    } else {
        Err(ComiciError::InvalidIdentifier(input.to_string()))
    }
}

fn is_plain_id(id: &str) -> bool {
    !id.is_empty() && id.chars().all(|c| c.is_ascii_alphanumeric())
}

fn id_from_host_url(input: &str, host: &Url) -> Result<String> {
    let url = Url::parse(input).map_err(|_| ComiciError::InvalidIdentifier(input.to_string()))?;
    let expected = host.host_str().unwrap_or_default();
    match url.host_str() {
        Some(actual) if !expected.is_empty() && actual.contains(expected) => Ok(id_from_href(input)),
        _ => Err(ComiciError::InvalidIdentifier(format!(
            "{} is not on {}",
            input, expected
        ))),
    }
}

/// Page window sent to `contentsInfo`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRange {
    pub from: u32,
    pub to: u32,
}

impl PageRange {
    /// Negative or oversized `to` means "through the last page"; `from`
    /// is then pulled into `[0, to]`.
    pub fn clamp(from: i64, to: i64, page_count: u32) -> Self {
        let count = i64::from(page_count);
        let to = if to < 0 || to > count { count } else { to };
        let from = from.clamp(0, to);
        Self {
            from: from as u32,
            to: to as u32,
        }
    }

    /// Digits in downloaded entry names: one more than `to` has.
    pub fn name_width(&self) -> usize {
        self.to.to_string().len() + 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn host() -> Url {
        Url::parse("https://comic.example").unwrap()
    }

    #[test]
    fn test_bare_ids() {
        assert_eq!(
            EpisodeIdent::parse("abcdef1234567", &host()).unwrap(),
            EpisodeIdent::Episode("abcdef1234567".into())
        );
        let viewer = "0123456789abcdef0123456789abcdef";
        assert_eq!(
            EpisodeIdent::parse(viewer, &host()).unwrap(),
            EpisodeIdent::Viewer(viewer.into())
        );
    }

    #[test]
    fn test_episode_url_on_host() {
        let ident = EpisodeIdent::parse("https://comic.example/episodes/abcdef1234567/", &host())
            .unwrap();
        assert_eq!(ident.as_str(), "abcdef1234567");
    }

    #[test]
    fn test_url_on_other_host_rejected() {
        let err = EpisodeIdent::parse("https://other.example/episodes/abcdef1234567/", &host())
            .unwrap_err();
        assert!(matches!(err, ComiciError::InvalidIdentifier(_)));
        assert!(EpisodeIdent::parse("short", &host()).is_err());
    }

    #[test]
    fn test_series_id() {
        assert_eq!(parse_series_id("aaaaaaaaaaaaa", &host()).unwrap(), "aaaaaaaaaaaaa");
        assert_eq!(
            parse_series_id("https://comic.example/series/bbbbbbbbbbbbb", &host()).unwrap(),
            "bbbbbbbbbbbbb"
        );
        assert!(parse_series_id("https://comic.example/series/x", &host()).is_err());
    }

    #[test]
    fn test_clamp_open_end() {
        assert_eq!(PageRange::clamp(0, -1, 24), PageRange { from: 0, to: 24 });
        assert_eq!(PageRange::clamp(0, 100, 24), PageRange { from: 0, to: 24 });
        assert_eq!(PageRange::clamp(3, 10, 24), PageRange { from: 3, to: 10 });
    }

    #[test]
    fn test_clamp_from() {
        assert_eq!(PageRange::clamp(30, -1, 24), PageRange { from: 24, to: 24 });
        assert_eq!(PageRange::clamp(-5, 10, 24), PageRange { from: 0, to: 10 });
    }

    #[test]
    fn test_name_width() {
        assert_eq!(PageRange::clamp(0, -1, 24).name_width(), 3);
        assert_eq!(PageRange::clamp(0, -1, 9).name_width(), 2);
        assert_eq!(PageRange::clamp(0, -1, 100).name_width(), 4);
    }
}
