//! Scanner script distribution
//!
//! The Lua scanner is served as a template with the public base URL and a
//! correlation token substituted in. Both values end up inside Lua string
//! literals, so they are checked against a conservative character set first.

use crate::validation::ValidationError;
use uuid::Uuid;

const SCANNER_TEMPLATE: &str = include_str!("scanner.lua");

const MAX_TOKEN_LEN: usize = 64;

/// Fresh correlation token for a scan
pub fn new_scan_id() -> String {
    Uuid::new_v4().simple().to_string()
}

/// `[A-Za-z0-9_-]{1,64}`
pub fn is_valid_token(token: &str) -> bool {
    !token.is_empty()
        && token.len() <= MAX_TOKEN_LEN
        && token
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'-')
}

/// Host, optional port and optional path prefix; nothing that could close a
/// Lua string or a shell-style command line.
pub fn is_valid_base_url(base: &str) -> bool {
    !base.is_empty()
        && base.len() <= 255
        && !base.contains("://")
        && base
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_' | ':' | '/' | '[' | ']'))
}

fn is_valid_scheme(scheme: &str) -> bool {
    matches!(scheme, "http" | "https")
}

/// Public location of this service as seen by the game server
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublicEndpoint {
    scheme: String,
    base: String,
}

impl PublicEndpoint {
    pub fn new(scheme: &str, base: &str) -> Result<Self, ValidationError> {
        if !is_valid_scheme(scheme) {
            return Err(ValidationError::new(
                "scheme",
                format!("expected http or https, got {:?}", scheme),
            ));
        }
        let base = base.trim_end_matches('/');
        if !is_valid_base_url(base) {
            return Err(ValidationError::new(
                "baseUrl",
                format!("{:?} is not a plain host[:port][/path]", base),
            ));
        }
        Ok(Self {
            scheme: scheme.to_string(),
            base: base.to_string(),
        })
    }

    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}://{}{}", self.scheme, self.base, path)
    }
}

fn check_scan_id(scan_id: &str) -> Result<(), ValidationError> {
    if is_valid_token(scan_id) {
        Ok(())
    } else {
        Err(ValidationError::new(
            "scan",
            "must be 1-64 characters of A-Z, a-z, 0-9, '_' or '-'",
        ))
    }
}

/// One-line `lua_run` command that fetches and runs the scanner
pub fn console_command(endpoint: &PublicEndpoint, scan_id: &str) -> Result<String, ValidationError> {
    check_scan_id(scan_id)?;
    let code_url = endpoint.url(&format!("/api/scanner-code?scan={}", scan_id));
    Ok(format!(
        "lua_run http.Fetch(\"{}\", function(body) RunString(body) end)",
        code_url
    ))
}

/// Scanner source with the endpoint and scan id filled in
pub fn render_scanner_code(endpoint: &PublicEndpoint, scan_id: &str) -> Result<String, ValidationError> {
    check_scan_id(scan_id)?;
    Ok(SCANNER_TEMPLATE
        .replace("{{SCHEME}}", endpoint.scheme())
        .replace("{{BASE_URL}}", endpoint.base())
        .replace("{{SCAN_ID}}", scan_id))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn endpoint() -> PublicEndpoint {
        PublicEndpoint::new("https", "scan.example.com").unwrap()
    }

    #[test]
    fn test_new_scan_id_is_token() {
        let id = new_scan_id();
        assert_eq!(id.len(), 32);
        assert!(is_valid_token(&id));
    }

    #[test]
    fn test_token_charset() {
        assert!(is_valid_token("V1StGXR8_Z5jdHi6B-myT"));
        assert!(!is_valid_token(""));
        assert!(!is_valid_token("a\"b"));
        assert!(!is_valid_token("a b"));
        assert!(!is_valid_token(&"a".repeat(65)));
    }

    #[test]
    fn test_base_url() {
        assert!(PublicEndpoint::new("https", "localhost:5000").is_ok());
        assert!(PublicEndpoint::new("http", "10.0.0.2:8080/gmod/").is_ok());
        assert!(PublicEndpoint::new("https", "evil\").host").is_err());
        assert!(PublicEndpoint::new("https", "https://double").is_err());
        assert!(PublicEndpoint::new("ftp", "host").is_err());
        assert_eq!(
            PublicEndpoint::new("http", "host:1/").unwrap().url("/x"),
            "http://host:1/x"
        );
    }

    #[test]
    fn test_console_command() {
        let command = console_command(&endpoint(), "abc123").unwrap();
        assert_eq!(
            command,
            "lua_run http.Fetch(\"https://scan.example.com/api/scanner-code?scan=abc123\", function(body) RunString(body) end)"
        );
        assert!(console_command(&endpoint(), "a\"b").is_err());
    }

    #[test]
    fn test_render_scanner_code() {
        let code = render_scanner_code(&endpoint(), "scan42").unwrap();
        assert!(code.contains("scanId = \"scan42\""));
        assert!(code.contains("baseUrl = \"scan.example.com\""));
        assert!(code.contains("scheme = \"https\""));
        assert!(!code.contains("{{"));
        assert!(code.contains("/api/analyze/issues"));
        assert!(code.contains("/api/analyze/complete"));
    }
}
