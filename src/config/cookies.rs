use std::path::Path;

use chrono::Utc;
use serde::Deserialize;
use url::Url;

use crate::app::{ComiciError, Result};

/// Cookies whose expiry is irrelevant to the session.
const EXEMPT_COOKIES: &[&str] = &["__stripe_sid"];

/// One entry of a Cookie-Editor JSON export.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cookie {
    pub name: String,
    pub value: String,
    #[serde(default)]
    pub domain: String,
    #[serde(default)]
    pub expiration_date: Option<f64>,
}

impl Cookie {
    pub fn header_value(&self) -> String {
        format!("{}={}; Path=/", self.name, self.value)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct CookieImport {
    pub ignore_expired: bool,
    pub check_domain: bool,
}

impl Default for CookieImport {
    fn default() -> Self {
        Self {
            ignore_expired: false,
            check_domain: true,
        }
    }
}

/// Read and validate a Cookie-Editor export for `host`.
pub fn load_cookie_file(path: &Path, host: &Url, options: CookieImport) -> Result<Vec<Cookie>> {
    if !path.is_file() {
        return Err(ComiciError::InvalidCookieFile {
            path: path.to_path_buf(),
            reason: "file not found".into(),
        });
    }

    let content = std::fs::read_to_string(path)?;
    let cookies: Vec<Cookie> =
        serde_json::from_str(&content).map_err(|e| ComiciError::InvalidCookieFile {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

    if cookies.is_empty() {
        return Err(ComiciError::InvalidCookieFile {
            path: path.to_path_buf(),
            reason: "no cookies in export".into(),
        });
    }

    validate_cookies(&cookies, host, Utc::now().timestamp(), options)?;
    tracing::info!("Loaded {} cookies from {}", cookies.len(), path.display());
    Ok(cookies)
}

pub fn validate_cookies(
    cookies: &[Cookie],
    host: &Url,
    now: i64,
    options: CookieImport,
) -> Result<()> {
    if !options.ignore_expired {
        let tracked = cookies
            .iter()
            .filter(|c| !EXEMPT_COOKIES.contains(&c.name.as_str()));
        let earliest = tracked
            .clone()
            .filter_map(|c| c.expiration_date)
            .fold(f64::INFINITY, f64::min);

        if earliest < now as f64 {
            let names = tracked
                .filter(|c| c.expiration_date.is_some_and(|exp| exp < now as f64))
                .map(|c| c.name.clone())
                .collect();
            return Err(ComiciError::CookiesExpired {
                names,
                earliest: earliest as i64,
            });
        }
    }

    if options.check_domain {
        let host_name = host.host_str().unwrap_or_default();
        let domain = cookies[0].domain.trim_start_matches('.');
        if !domain.is_empty() && !host_name.contains(domain) {
            return Err(ComiciError::CookieDomainMismatch {
                domain: cookies[0].domain.clone(),
                host: host_name.to_string(),
            });
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const NOW: i64 = 1_700_000_000;

    fn cookie(name: &str, domain: &str, exp: Option<f64>) -> Cookie {
        Cookie {
            name: name.into(),
            value: "v".into(),
            domain: domain.into(),
            expiration_date: exp,
        }
    }

    fn host() -> Url {
        Url::parse("https://comic-growl.com").unwrap()
    }

    #[test]
    fn test_valid_cookies() {
        let cookies = vec![
            cookie("session", ".comic-growl.com", Some(NOW as f64 + 3600.0)),
            cookie("pref", ".comic-growl.com", None),
        ];
        assert!(validate_cookies(&cookies, &host(), NOW, CookieImport::default()).is_ok());
    }

    #[test]
    fn test_expired_cookies_rejected() {
        let cookies = vec![
            cookie("session", ".comic-growl.com", Some(NOW as f64 - 10.0)),
            cookie("pref", ".comic-growl.com", Some(NOW as f64 + 10.0)),
        ];
        let err = validate_cookies(&cookies, &host(), NOW, CookieImport::default()).unwrap_err();
        match err {
            ComiciError::CookiesExpired { names, earliest } => {
                assert_eq!(names, vec!["session".to_string()]);
                assert_eq!(earliest, NOW - 10);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_exempt_cookie_expiry_ignored() {
        let cookies = vec![
            cookie("session", ".comic-growl.com", Some(NOW as f64 + 10.0)),
            cookie("__stripe_sid", ".comic-growl.com", Some(NOW as f64 - 10.0)),
        ];
        assert!(validate_cookies(&cookies, &host(), NOW, CookieImport::default()).is_ok());
    }

    #[test]
    fn test_expiry_override() {
        let cookies = vec![cookie("session", ".comic-growl.com", Some(0.0))];
        let options = CookieImport {
            ignore_expired: true,
            ..CookieImport::default()
        };
        assert!(validate_cookies(&cookies, &host(), NOW, options).is_ok());
    }

    #[test]
    fn test_domain_mismatch_is_optional() {
        let cookies = vec![cookie("session", ".other.example", None)];
        let err = validate_cookies(&cookies, &host(), NOW, CookieImport::default()).unwrap_err();
        assert!(matches!(err, ComiciError::CookieDomainMismatch { .. }));

        let options = CookieImport {
            check_domain: false,
            ..CookieImport::default()
        };
        assert!(validate_cookies(&cookies, &host(), NOW, options).is_ok());
    }

    #[test]
    fn test_load_cookie_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"[{{"name":"session","value":"abc","domain":".comic-growl.com","expirationDate":99999999999}}]"#
        )
        .unwrap();

        let cookies = load_cookie_file(file.path(), &host(), CookieImport::default()).unwrap();
        assert_eq!(cookies.len(), 1);
        assert_eq!(cookies[0].header_value(), "session=abc; Path=/");
    }

    #[test]
    fn test_load_cookie_file_rejects_non_array() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"name":"session"}}"#).unwrap();

        let err = load_cookie_file(file.path(), &host(), CookieImport::default()).unwrap_err();
        assert!(matches!(err, ComiciError::InvalidCookieFile { .. }));
    }
}
