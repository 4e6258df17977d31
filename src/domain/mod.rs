pub mod content;
pub mod episode;
pub mod series;

pub use content::{ContentPage, PageOutcome, ViewerHandle};
pub use episode::{BookInfo, EpisodeInfo, EpisodeRef};
pub use series::{Author, BookshelfEntry, SeriesSummary};

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer};

/// Last non-empty path segment of an href, which the site uses as the id.
pub fn id_from_href(href: &str) -> String {
    let path = match url::Url::parse(href) {
        Ok(url) => url.path().to_string(),
        Err(_) => href.split(['?', '#']).next().unwrap_or_default().to_string(),
    };
    path.trim_end_matches('/')
        .rsplit('/')
        .next()
        .unwrap_or_default()
        .to_string()
}

/// Parse the ISO-8601 flavours the metadata endpoints emit.
pub fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .ok()
        .or_else(|| {
            ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S"]
                .iter()
                .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
                .map(|naive| naive.and_utc())
        })
}

/// Numbers arrive as JSON numbers on some sites and as strings on others.
pub(crate) fn de_lenient_u32<'de, D>(deserializer: D) -> std::result::Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum NumOrStr {
        Num(u32),
        Str(String),
    }

    match NumOrStr::deserialize(deserializer)? {
        NumOrStr::Num(n) => Ok(n),
        NumOrStr::Str(s) if s.trim().is_empty() => Ok(0),
        NumOrStr::Str(s) => s.trim().parse().map_err(serde::de::Error::custom),
    }
}

pub(crate) fn de_lenient_string<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        None | Some(serde_json::Value::Null) => String::new(),
        Some(serde_json::Value::String(s)) => s,
        Some(other) => other.to_string(),
    })
}

pub(crate) fn de_timestamp<'de, D>(
    deserializer: D,
) -> std::result::Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value.as_deref().and_then(parse_timestamp))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};

    #[test]
    fn test_id_from_href() {
        assert_eq!(
            id_from_href("https://comic-growl.com/episodes/abcdef1234567/"),
            "abcdef1234567"
        );
        assert_eq!(id_from_href("/series/0123456789abc"), "0123456789abc");
        assert_eq!(id_from_href("/authors/42?page=1"), "42");
    }

    #[test]
    fn test_parse_timestamp_with_offset() {
        let dt = parse_timestamp("2024-03-01T09:00:00+09:00").unwrap();
        assert_eq!(dt.hour(), 0);
        assert_eq!(dt.day(), 1);
    }

    #[test]
    fn test_parse_timestamp_naive() {
        let dt = parse_timestamp("2024-03-01 12:30:00").unwrap();
        assert_eq!(dt.hour(), 12);
        assert_eq!(dt.minute(), 30);
        assert!(parse_timestamp("").is_none());
        assert!(parse_timestamp("yesterday").is_none());
    }
}
