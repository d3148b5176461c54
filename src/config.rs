//! Runtime configuration.
//!
//! Values come from environment variables with CLI flags taking precedence,
//! mirroring how the server binary has always been configured.

use std::env;
use std::path::PathBuf;

pub const DEFAULT_HTTP_PORT: u16 = 7878;
pub const DEFAULT_SESSION_COOKIE: &str = "brewhub_session";

/// Settings consulted by the identity layer and the access guard.
#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// Where a guarded request is redirected when nobody is signed in.
    pub denied_redirect: String,
    /// Name of the cookie carrying the session id.
    pub session_cookie: String,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self { denied_redirect: "/".to_string(), session_cookie: DEFAULT_SESSION_COOKIE.to_string() }
    }
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub http_port: u16,
    pub auth: AuthConfig,
    /// Optional JSON file with accounts to preload into the in-memory store.
    pub seed_file: Option<PathBuf>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { http_port: DEFAULT_HTTP_PORT, auth: AuthConfig::default(), seed_file: None }
    }
}

impl ServerConfig {
    /// Read `BREWHUB_HTTP_PORT`, `BREWHUB_DENIED_REDIRECT`, `BREWHUB_SESSION_COOKIE`
    /// and `BREWHUB_SEED_FILE`, falling back to defaults for anything unset or unparsable.
    pub fn from_env() -> Self {
        let mut cfg = Self::default();
        if let Some(port) = parse_port_env("BREWHUB_HTTP_PORT") {
            cfg.http_port = port;
        }
        if let Some(loc) = non_empty_env("BREWHUB_DENIED_REDIRECT") {
            cfg.auth.denied_redirect = loc;
        }
        if let Some(name) = non_empty_env("BREWHUB_SESSION_COOKIE") {
            cfg.auth.session_cookie = name;
        }
        cfg.seed_file = non_empty_env("BREWHUB_SEED_FILE").map(PathBuf::from);
        cfg
    }

    /// Apply `--port <n>`, `--denied-redirect <path>` and `--seed <file>` flags.
    pub fn with_args(mut self, args: &[String]) -> Self {
        if let Some(port) = flag_value(args, "--port").and_then(|v| v.parse::<u16>().ok()) {
            self.http_port = port;
        }
        if let Some(loc) = flag_value(args, "--denied-redirect") {
            self.auth.denied_redirect = loc.to_string();
        }
        if let Some(seed) = flag_value(args, "--seed") {
            self.seed_file = Some(PathBuf::from(seed));
        }
        self
    }
}

fn parse_port_env(name: &str) -> Option<u16> {
    match env::var(name) {
        Ok(val) => val.parse::<u16>().ok(),
        Err(_) => None,
    }
}

fn non_empty_env(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn flag_value<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    let mut i = 0;
    while i < args.len() {
        if args[i] == flag && i + 1 < args.len() {
            return Some(args[i + 1].as_str());
        }
        i += 1;
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(v: &[&str]) -> Vec<String> { v.iter().map(|s| s.to_string()).collect() }

    #[test]
    fn defaults() {
        let cfg = ServerConfig::default();
        assert_eq!(cfg.http_port, 7878);
        assert_eq!(cfg.auth.denied_redirect, "/");
        assert_eq!(cfg.auth.session_cookie, "brewhub_session");
        assert!(cfg.seed_file.is_none());
    }

    #[test]
    fn flags_override() {
        let cfg = ServerConfig::default().with_args(&args(&["brewhub", "--port", "9000", "--denied-redirect", "/login", "--seed", "accounts.json"]));
        assert_eq!(cfg.http_port, 9000);
        assert_eq!(cfg.auth.denied_redirect, "/login");
        assert_eq!(cfg.seed_file.as_deref(), Some(std::path::Path::new("accounts.json")));
    }

    #[test]
    fn bad_port_flag_is_ignored() {
        let cfg = ServerConfig::default().with_args(&args(&["--port", "not-a-port"]));
        assert_eq!(cfg.http_port, DEFAULT_HTTP_PORT);
        // dangling flag without a value
        let cfg = ServerConfig::default().with_args(&args(&["--port"]));
        assert_eq!(cfg.http_port, DEFAULT_HTTP_PORT);
    }
}
