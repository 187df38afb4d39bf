// src/auth.rs
//! Bearer token resolution for queue requests

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Url;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::debug;

use crate::core::{ApiConfig, AuthSourcesConfig};

#[async_trait]
pub trait AuthTokenProvider: Send + Sync + 'static {
    /// A non-empty bearer token, or `None` when the user is not logged in
    async fn token(&self) -> Option<String>;
}

/// One place a token may be stored
#[async_trait]
pub trait TokenSource: Send + Sync {
    fn name(&self) -> &'static str;

    async fn read(&self) -> Result<Option<String>>;
}

/// Tries sources in order; the first non-empty token wins
pub struct TokenChain {
    sources: Vec<Box<dyn TokenSource>>,
}

impl TokenChain {
    pub fn new() -> Self {
        Self {
            sources: Vec::new(),
        }
    }

    pub fn with_source(mut self, source: impl TokenSource + 'static) -> Self {
        self.sources.push(Box::new(source));
        self
    }

    /// Try `source` before every source added so far
    pub fn with_first(mut self, source: impl TokenSource + 'static) -> Self {
        self.sources.insert(0, Box::new(source));
        self
    }

    /// Cookie, then persisted storage, then the app page's storage
    pub fn from_config(auth: &AuthSourcesConfig, api: &ApiConfig) -> Self {
        let mut chain = Self::new();

        if let Some(cookie) = &auth.cookie {
            chain = chain.with_source(CookieSource::new(cookie.clone(), auth.cookie_name.clone()));
        }

        if let Some(file) = &auth.storage_file {
            chain = chain.with_source(StorageFileSource::new(file.clone(), auth.storage_key.clone()));
        }

        if let (Some(file), Some(active_origin)) = (&auth.app_storage_file, &auth.active_origin) {
            chain = chain.with_source(AppStorageSource::new(
                StorageFileSource::new(file.clone(), auth.storage_key.clone()),
                api.app_url.clone(),
                active_origin.clone(),
            ));
        }

        chain
    }

    pub fn into_provider(self) -> Arc<dyn AuthTokenProvider> {
        Arc::new(self)
    }
}

impl Default for TokenChain {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AuthTokenProvider for TokenChain {
    async fn token(&self) -> Option<String> {
        for source in &self.sources {
            match source.read().await {
                Ok(Some(token)) => {
                    let token = token.trim();
                    if !token.is_empty() {
                        debug!("Auth token resolved from {}", source.name());
                        return Some(token.to_string());
                    }
                }
                Ok(None) => {}
                Err(e) => debug!("Token source {} unavailable: {:#}", source.name(), e),
            }
        }
        None
    }
}

/// Fixed token, e.g. from the `--token` flag
pub struct StaticToken(Option<String>);

impl StaticToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(Some(token.into()))
    }

    pub fn none() -> Self {
        Self(None)
    }
}

#[async_trait]
impl AuthTokenProvider for StaticToken {
    async fn token(&self) -> Option<String> {
        self.0.clone().filter(|token| !token.trim().is_empty())
    }
}

#[async_trait]
impl TokenSource for StaticToken {
    fn name(&self) -> &'static str {
        "static"
    }

    async fn read(&self) -> Result<Option<String>> {
        Ok(self.0.clone())
    }
}

/// Named cookie looked up in a `Cookie:` header style string
pub struct CookieSource {
    header: String,
    cookie_name: String,
}

impl CookieSource {
    pub fn new(header: String, cookie_name: String) -> Self {
        Self {
            header,
            cookie_name,
        }
    }
}

/// Value of `name` in "a=1; b=2"
pub fn find_cookie(header: &str, name: &str) -> Option<String> {
    header
        .split(';')
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| key.trim() == name)
        .map(|(_, value)| value.trim().trim_matches('"').to_string())
}

#[async_trait]
impl TokenSource for CookieSource {
    fn name(&self) -> &'static str {
        "cookie"
    }

    async fn read(&self) -> Result<Option<String>> {
        Ok(find_cookie(&self.header, &self.cookie_name))
    }
}

/// String value under `key` in a JSON object file
pub struct StorageFileSource {
    path: PathBuf,
    key: String,
}

impl StorageFileSource {
    pub fn new(path: PathBuf, key: String) -> Self {
        Self { path, key }
    }
}

#[async_trait]
impl TokenSource for StorageFileSource {
    fn name(&self) -> &'static str {
        "storage"
    }

    async fn read(&self) -> Result<Option<String>> {
        if !tokio::fs::try_exists(&self.path).await.unwrap_or(false) {
            return Ok(None);
        }

        let content = tokio::fs::read_to_string(&self.path)
            .await
            .with_context(|| format!("Failed to read storage file: {}", self.path.display()))?;

        let storage: serde_json::Value = serde_json::from_str(&content)
            .with_context(|| format!("Invalid JSON in storage file: {}", self.path.display()))?;

        Ok(storage
            .get(&self.key)
            .and_then(|value| value.as_str())
            .map(str::to_string))
    }
}

/// Reads the web app's page storage, only while the host looks at the app's
/// own origin
pub struct AppStorageSource {
    storage: StorageFileSource,
    app_url: String,
    active_origin: String,
}

impl AppStorageSource {
    pub fn new(storage: StorageFileSource, app_url: String, active_origin: String) -> Self {
        Self {
            storage,
            app_url,
            active_origin,
        }
    }
}

/// Scheme, host and port match
pub fn same_origin(a: &str, b: &str) -> bool {
    match (Url::parse(a), Url::parse(b)) {
        (Ok(a), Ok(b)) => a.origin() == b.origin(),
        _ => false,
    }
}

#[async_trait]
impl TokenSource for AppStorageSource {
    fn name(&self) -> &'static str {
        "app-storage"
    }

    async fn read(&self) -> Result<Option<String>> {
        if !same_origin(&self.app_url, &self.active_origin) {
            debug!(
                "Active origin {} is not the app origin, skipping page storage",
                self.active_origin
            );
            return Ok(None);
        }
        self.storage.read().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_find_cookie() {
        let header = "theme=dark; auth_token=abc123; other=1";
        assert_eq!(find_cookie(header, "auth_token").as_deref(), Some("abc123"));
        assert_eq!(find_cookie(header, "missing"), None);
        assert_eq!(
            find_cookie("auth_token=\"quoted\"", "auth_token").as_deref(),
            Some("quoted")
        );
    }

    #[test]
    fn test_same_origin() {
        assert!(same_origin("http://localhost:3000", "http://localhost:3000/jobs/1"));
        assert!(!same_origin("http://localhost:3000", "http://localhost:3001"));
        assert!(!same_origin("https://app.example.com", "http://app.example.com"));
        assert!(!same_origin("not a url", "http://localhost"));
    }

    #[tokio::test]
    async fn test_chain_first_non_empty_wins() {
        let chain = TokenChain::new()
            .with_source(CookieSource::new("auth_token=".to_string(), "auth_token".to_string()))
            .with_source(StaticToken::new("  second  "))
            .with_source(StaticToken::new("third"));

        assert_eq!(chain.token().await.as_deref(), Some("second"));
    }

    #[tokio::test]
    async fn test_chain_without_token() {
        let chain = TokenChain::new().with_source(StaticToken::none());
        assert_eq!(chain.token().await, None);
        assert_eq!(TokenChain::new().token().await, None);
    }

    #[tokio::test]
    async fn test_storage_file_source() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"authToken": "from-storage", "other": 1}}"#).unwrap();

        let source = StorageFileSource::new(file.path().to_path_buf(), "authToken".to_string());
        assert_eq!(source.read().await.unwrap().as_deref(), Some("from-storage"));

        let missing_key = StorageFileSource::new(file.path().to_path_buf(), "nope".to_string());
        assert_eq!(missing_key.read().await.unwrap(), None);

        let missing_file =
            StorageFileSource::new(PathBuf::from("/nonexistent/storage.json"), "authToken".to_string());
        assert_eq!(missing_file.read().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_malformed_storage_falls_through_chain() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();

        let chain = TokenChain::new()
            .with_source(StorageFileSource::new(
                file.path().to_path_buf(),
                "authToken".to_string(),
            ))
            .with_source(StaticToken::new("fallback"));

        assert_eq!(chain.token().await.as_deref(), Some("fallback"));
    }

    #[tokio::test]
    async fn test_app_storage_requires_app_origin() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"authToken": "page-token"}}"#).unwrap();
        let storage = || StorageFileSource::new(file.path().to_path_buf(), "authToken".to_string());

        let on_app = AppStorageSource::new(
            storage(),
            "http://localhost:3000".to_string(),
            "http://localhost:3000/dashboard".to_string(),
        );
        assert_eq!(on_app.read().await.unwrap().as_deref(), Some("page-token"));

        let elsewhere = AppStorageSource::new(
            storage(),
            "http://localhost:3000".to_string(),
            "https://www.linkedin.com/jobs/view/1".to_string(),
        );
        assert_eq!(elsewhere.read().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_with_first_takes_precedence() {
        let chain = TokenChain::new()
            .with_source(StaticToken::new("configured"))
            .with_first(StaticToken::new("flag"));
        assert_eq!(chain.token().await.as_deref(), Some("flag"));
    }

    #[test]
    fn test_chain_from_config() {
        let auth = AuthSourcesConfig {
            cookie: Some("auth_token=abc".to_string()),
            storage_file: Some(PathBuf::from("/tmp/storage.json")),
            ..AuthSourcesConfig::default()
        };
        let chain = TokenChain::from_config(&auth, &ApiConfig::default());
        assert_eq!(chain.sources.len(), 2);
        assert_eq!(chain.sources[0].name(), "cookie");
        assert_eq!(chain.sources[1].name(), "storage");
    }
}
