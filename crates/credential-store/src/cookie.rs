//! Cookie-format session mirror.
//!
//! The mirror keeps a copy of each record as a `Set-Cookie` line scoped to
//! the parent domain, so every subdomain of the site sees the same session.
//! Records carry an absolute expiry derived from the 7-day max age; expired
//! lines read back as absent.

use crate::{KeyValueStore, StoreResult};
use chrono::{DateTime, NaiveDateTime, Utc};
use std::path::PathBuf;
use std::sync::Mutex;

/// Max-Age for mirrored session cookies: 7 days.
pub const SESSION_COOKIE_MAX_AGE_SECS: i64 = 604_800;

const HTTP_DATE_FORMAT: &str = "%a, %d %b %Y %H:%M:%S GMT";

/// A parsed `Set-Cookie` line.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedCookie {
    pub name: String,
    pub value: String,
    pub domain: Option<String>,
    pub expires: Option<DateTime<Utc>>,
}

fn encode_value(value: &str) -> String {
    url::form_urlencoded::byte_serialize(value.as_bytes()).collect()
}

fn decode_value(raw: &str) -> Option<String> {
    url::form_urlencoded::parse(format!("v={raw}").as_bytes())
        .find(|(k, _)| k == "v")
        .map(|(_, v)| v.into_owned())
}

/// Format a `Set-Cookie` line for a mirrored record.
///
/// The value is form-encoded so JSON payloads survive the cookie grammar.
/// `Secure` and `SameSite=Lax` keep the cookie off plain HTTP and out of
/// cross-site POSTs.
pub fn format_set_cookie(
    name: &str,
    value: &str,
    domain: &str,
    expires: DateTime<Utc>,
) -> String {
    format!(
        "{}={}; Domain={}; Path=/; Max-Age={}; Expires={}; Secure; SameSite=Lax",
        name,
        encode_value(value),
        domain,
        SESSION_COOKIE_MAX_AGE_SECS,
        expires.format(HTTP_DATE_FORMAT),
    )
}

/// Parse a `Set-Cookie` line produced by [`format_set_cookie`].
///
/// Unknown attributes are ignored. Returns `None` if the line has no
/// `name=value` pair or the value fails to decode.
pub fn parse_set_cookie(line: &str) -> Option<ParsedCookie> {
    let mut parts = line.split(';').map(str::trim);

    let pair = parts.next()?;
    let (name, raw_value) = pair.split_once('=')?;
    if name.is_empty() {
        return None;
    }
    let value = decode_value(raw_value)?;

    let mut domain = None;
    let mut expires = None;
    for attr in parts {
        if let Some((key, val)) = attr.split_once('=') {
            match key.to_ascii_lowercase().as_str() {
                "domain" => domain = Some(val.to_string()),
                "expires" => {
                    expires = NaiveDateTime::parse_from_str(val, HTTP_DATE_FORMAT)
                        .ok()
                        .map(|dt| dt.and_utc());
                }
                _ => {}
            }
        }
    }

    Some(ParsedCookie {
        name: name.to_string(),
        value,
        domain,
        expires,
    })
}

/// Key-value store that persists each record as one `Set-Cookie` line.
///
/// Reads drop lines whose `Expires` has passed, which is what enforces the
/// 7-day backup window on the mirror side.
pub struct CookieFileStore {
    path: PathBuf,
    domain: String,
    lock: Mutex<()>,
}

impl CookieFileStore {
    pub fn new(path: PathBuf, domain: &str) -> Self {
        Self {
            path,
            domain: domain.to_string(),
            lock: Mutex::new(()),
        }
    }

    fn read_lines(&self) -> StoreResult<Vec<String>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let content = std::fs::read_to_string(&self.path)?;
        Ok(content
            .lines()
            .filter(|l| !l.trim().is_empty())
            .map(String::from)
            .collect())
    }

    fn write_lines(&self, lines: &[String]) -> StoreResult<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.path, lines.join("\n"))?;
        Ok(())
    }
}

impl KeyValueStore for CookieFileStore {
    fn set(&self, key: &str, value: &str) -> StoreResult<()> {
        let _guard = self.lock.lock().unwrap();
        let expires = Utc::now() + chrono::Duration::seconds(SESSION_COOKIE_MAX_AGE_SECS);
        let line = format_set_cookie(key, value, &self.domain, expires);

        let mut lines = self.read_lines()?;
        lines.retain(|l| parse_set_cookie(l).map(|c| c.name != key).unwrap_or(false));
        lines.push(line);
        self.write_lines(&lines)
    }

    fn get(&self, key: &str) -> StoreResult<Option<String>> {
        let _guard = self.lock.lock().unwrap();
        let now = Utc::now();
        for line in self.read_lines()? {
            let Some(cookie) = parse_set_cookie(&line) else {
                continue;
            };
            if cookie.name != key {
                continue;
            }
            if let Some(expires) = cookie.expires {
                if expires <= now {
                    return Ok(None);
                }
            }
            return Ok(Some(cookie.value));
        }
        Ok(None)
    }

    fn delete(&self, key: &str) -> StoreResult<bool> {
        let _guard = self.lock.lock().unwrap();
        let mut lines = self.read_lines()?;
        let original_len = lines.len();
        lines.retain(|l| parse_set_cookie(l).map(|c| c.name != key).unwrap_or(false));
        if lines.len() == original_len {
            return Ok(false);
        }
        self.write_lines(&lines)?;
        Ok(true)
    }
}
