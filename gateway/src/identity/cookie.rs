//! Cookie directives and request cookie lookup

use crate::config::CookieSpec;
use std::fmt;

/// Instruction for the HTTP layer to set a cookie on the response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CookieDirective {
    pub name: String,
    pub value: String,
    /// Lifetime in seconds
    pub max_age: Option<i64>,
    pub path: Option<String>,
    pub domain: Option<String>,
    pub secure: Option<bool>,
    pub version: Option<u32>,
}

impl CookieDirective {
    /// Directive for the configured cookie carrying `value` for `max_age` seconds.
    ///
    /// Empty path or domain settings are left unset.
    pub fn for_cookie(settings: &CookieSpec, value: impl Into<String>, max_age: i64) -> Self {
        let non_empty = |s: &str| (!s.is_empty()).then(|| s.to_string());
        Self {
            name: settings.name.clone(),
            value: value.into(),
            max_age: Some(max_age),
            path: non_empty(&settings.path),
            domain: non_empty(&settings.domain),
            secure: None,
            version: None,
        }
    }

    /// Render as a `Set-Cookie` header value
    pub fn to_header_value(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for CookieDirective {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.name, self.value)?;
        if let Some(max_age) = self.max_age {
            write!(f, "; Max-Age={max_age}")?;
        }
        if let Some(path) = &self.path {
            write!(f, "; Path={path}")?;
        }
        if let Some(domain) = &self.domain {
            write!(f, "; Domain={domain}")?;
        }
        if self.secure == Some(true) {
            f.write_str("; Secure")?;
        }
        if let Some(version) = self.version {
            write!(f, "; Version={version}")?;
        }
        Ok(())
    }
}

/// Split a `Cookie` request header into name/value pairs
pub fn parse_cookie_header(header: &str) -> Vec<(String, String)> {
    header
        .split(';')
        .filter_map(|pair| {
            let (name, value) = pair.split_once('=')?;
            let name = name.trim();
            if name.is_empty() {
                return None;
            }
            Some((name.to_string(), value.trim().trim_matches('"').to_string()))
        })
        .collect()
}

/// Value of the first cookie whose name matches `name` ignoring ASCII case
pub fn find_cookie<'a>(cookies: &'a [(String, String)], name: &str) -> Option<&'a str> {
    cookies
        .iter()
        .find(|(n, _)| n.eq_ignore_ascii_case(name))
        .map(|(_, v)| v.as_str())
}
