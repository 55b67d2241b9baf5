//! Self-hosting: fetch a Google Fonts stylesheet, download every font it
//! references and write a rewritten copy that points at the local files.

use std::path::{Path, PathBuf};
use std::time::Duration;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use futures::{StreamExt, TryStreamExt, stream};
use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue, USER_AGENT};
use serde::{Deserialize, Serialize};

use crate::api::{FontsApi, GOOGLE_FONTS_HOST};
use crate::css::{DEFAULT_FILENAME_TEMPLATE, ExtractedFontFace, FontFaceExtractor, rewrite_css};
use crate::error::{Error, Result};

/// Sent unless the caller configures their own `user-agent`. Google serves
/// woff2 only to browsers it recognizes.
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
     AppleWebKit/537.36 (KHTML, like Gecko) Chrome/98.0.4758.102 Safari/537.36";

/// Content type assumed for font responses that do not declare one
pub const DEFAULT_FONT_MIME: &str = "font/woff2";

/// Settings for one download run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DownloaderConfig {
    /// Embed fonts as `data:` URIs instead of writing font files
    pub inline_as_base64: bool,
    /// Treat the run as a replacement even when the previous stylesheet came
    /// from the same URL
    pub overwrite_existing: bool,
    /// Root for everything written
    pub output_directory: PathBuf,
    /// Stylesheet location, relative to `output_directory`
    pub stylesheet_relative_path: PathBuf,
    /// Font directory, relative to `output_directory`
    pub fonts_subdirectory: PathBuf,
    /// How the stylesheet refers to the font directory
    pub fonts_url_prefix: String,
    /// Extra request headers, sent in order
    pub request_headers: Vec<(String, String)>,
    /// Host a source URL must point at
    pub api_host: String,
    /// Template for font filenames, see [`FontFaceExtractor::with_template`].
    /// Repeated names are made unique, but `{i}` keeps them stable.
    pub filename_template: String,
    /// Per-request timeout; 0 disables it
    pub request_timeout_secs: u64,
    /// Upper bound on font downloads in flight
    pub max_concurrent_fetches: usize,
}

impl Default for DownloaderConfig {
    fn default() -> Self {
        Self {
            inline_as_base64: false,
            overwrite_existing: false,
            output_directory: PathBuf::from("."),
            stylesheet_relative_path: PathBuf::from("fonts.css"),
            fonts_subdirectory: PathBuf::from("fonts"),
            fonts_url_prefix: "./fonts".to_string(),
            request_headers: Vec::new(),
            api_host: GOOGLE_FONTS_HOST.to_string(),
            filename_template: DEFAULT_FILENAME_TEMPLATE.to_string(),
            request_timeout_secs: 30,
            max_concurrent_fetches: 8,
        }
    }
}

impl DownloaderConfig {
    pub fn stylesheet_path(&self) -> PathBuf {
        self.output_directory.join(&self.stylesheet_relative_path)
    }

    pub fn fonts_directory(&self) -> PathBuf {
        self.output_directory.join(&self.fonts_subdirectory)
    }

    /// Request headers as sent: the configured ones, plus the default
    /// `user-agent` when none was given.
    pub fn header_map(&self) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        for (name, value) in &self.request_headers {
            let header_name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| Error::Config(format!("invalid header name {name:?}: {e}")))?;
            let header_value = HeaderValue::from_str(value)
                .map_err(|e| Error::Config(format!("invalid value for header {name:?}: {e}")))?;
            headers.append(header_name, header_value);
        }
        if !headers.contains_key(USER_AGENT) {
            headers.insert(USER_AGENT, HeaderValue::from_static(DEFAULT_USER_AGENT));
        }
        Ok(headers)
    }
}

/// Observation points of a download run. Every method defaults to a no-op;
/// hooks cannot alter the run.
#[allow(unused_variables)]
pub trait DownloadHooks: Send + Sync {
    fn before_css_fetch(&self, url: &str) {}

    fn after_css_fetch(&self, url: &str, css: &str, fonts: &[ExtractedFontFace]) {}

    fn before_font_fetch(&self, font: &ExtractedFontFace) {}

    /// Called once the font is on disk (or inlined); not called for dropped fonts
    fn after_font_fetch(&self, font: &ExtractedFontFace) {}

    fn before_css_write(&self, path: &Path, css: &str, fonts: &[ExtractedFontFace]) {}

    fn after_css_write(&self, path: &Path, new_css: &str, old_css: &str) {}
}

/// Hooks that do nothing
#[derive(Debug, Default, Clone, Copy)]
pub struct NoHooks;

impl DownloadHooks for NoHooks {}

/// A font that made it into the rewritten stylesheet
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DownloadedFont {
    pub face: ExtractedFontFace,
    /// Where the font was written; `None` when inlined
    pub path: Option<PathBuf>,
    pub content_type: String,
    pub size: usize,
}

/// Outcome of a download run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DownloadReport {
    pub url: String,
    pub stylesheet_path: PathBuf,
    /// Final stylesheet text, as written
    pub css: String,
    pub fonts: Vec<DownloadedFont>,
    /// True when `overwrite_existing` was set or the previous stylesheet came
    /// from another URL. Nothing is deleted either way: font files from an
    /// earlier run stay next to the new ones.
    pub overwriting: bool,
}

/// Downloads one stylesheet and its fonts
pub struct Downloader {
    url: String,
    config: DownloaderConfig,
    api: FontsApi,
    client: reqwest::Client,
}

impl Downloader {
    pub fn new(url: impl Into<String>, config: DownloaderConfig) -> Result<Self> {
        let mut builder = reqwest::Client::builder().default_headers(config.header_map()?);
        if config.request_timeout_secs > 0 {
            builder = builder.timeout(Duration::from_secs(config.request_timeout_secs));
        }
        let client = builder
            .build()
            .map_err(|e| Error::Config(format!("failed to create HTTP client: {e}")))?;

        Ok(Self {
            url: url.into(),
            api: FontsApi::new(config.api_host.clone()),
            config,
            client,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn config(&self) -> &DownloaderConfig {
        &self.config
    }

    pub async fn execute(&self) -> Result<DownloadReport> {
        self.execute_with_hooks(&NoHooks).await
    }

    pub async fn execute_with_hooks(&self, hooks: &dyn DownloadHooks) -> Result<DownloadReport> {
        if !self.api.is_valid_url(&self.url) {
            return Err(Error::InvalidSourceUrl {
                url: self.url.clone(),
            });
        }

        let stylesheet_path = self.config.stylesheet_path();
        let mut overwriting = self.config.overwrite_existing;
        if !overwriting && let Some(previous) = previous_source_url(&stylesheet_path).await? {
            overwriting = previous != self.url;
        }
        tracing::debug!(
            url = %self.url,
            path = %stylesheet_path.display(),
            overwriting,
            "starting download"
        );

        hooks.before_css_fetch(&self.url);
        let css = self.fetch_css().await?;
        let extracted = FontFaceExtractor::new(self.config.fonts_url_prefix.as_str())
            .with_template(self.config.filename_template.as_str())
            .extract(&css);
        tracing::debug!(bytes = css.len(), fonts = extracted.len(), "fetched stylesheet");
        hooks.after_css_fetch(&self.url, &css, &extracted);

        let fonts: Vec<DownloadedFont> = stream::iter(extracted)
            .map(|font| self.fetch_font(font, hooks))
            .buffered(self.config.max_concurrent_fetches.max(1))
            .try_collect::<Vec<_>>()
            .await?
            .into_iter()
            .flatten()
            .collect();

        let faces: Vec<ExtractedFontFace> = fonts.iter().map(|f| f.face.clone()).collect();
        hooks.before_css_write(&stylesheet_path, &css, &faces);
        let content = rewrite_css(&format!("/* {} */\n{}", self.url, css), &faces);
        write_file(&stylesheet_path, content.as_bytes()).await?;
        hooks.after_css_write(&stylesheet_path, &content, &css);

        tracing::info!(
            path = %stylesheet_path.display(),
            fonts = fonts.len(),
            inlined = self.config.inline_as_base64,
            "wrote stylesheet"
        );

        Ok(DownloadReport {
            url: self.url.clone(),
            stylesheet_path,
            css: content,
            fonts,
            overwriting,
        })
    }

    async fn fetch_css(&self) -> Result<String> {
        let upstream = |source| Error::UpstreamFetch {
            url: self.url.clone(),
            source,
        };
        self.client
            .get(&self.url)
            .send()
            .await
            .and_then(|response| response.error_for_status())
            .map_err(upstream)?
            .text()
            .await
            .map_err(upstream)
    }

    /// Fetch and materialize one font. `Ok(None)` means the font was dropped;
    /// only filesystem failures are errors.
    async fn fetch_font(
        &self,
        mut font: ExtractedFontFace,
        hooks: &dyn DownloadHooks,
    ) -> Result<Option<DownloadedFont>> {
        hooks.before_font_fetch(&font);

        let Some((content_type, bytes)) = self.fetch_font_bytes(&font.source_url).await else {
            return Ok(None);
        };

        let path = if self.config.inline_as_base64 {
            font.replacement_text = format!(
                "url('data:{content_type};base64,{}')",
                STANDARD.encode(&bytes)
            );
            None
        } else {
            let path = self.config.fonts_directory().join(&font.generated_filename);
            write_file(&path, &bytes).await?;
            Some(path)
        };
        tracing::debug!(url = %font.source_url, size = bytes.len(), "fetched font");

        hooks.after_font_fetch(&font);
        Ok(Some(DownloadedFont {
            face: font,
            path,
            content_type,
            size: bytes.len(),
        }))
    }

    async fn fetch_font_bytes(&self, url: &str) -> Option<(String, Vec<u8>)> {
        let response = match self.client.get(url).send().await {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!(url, error = %e, "font fetch failed, dropping font");
                return None;
            }
        };
        if !response.status().is_success() {
            tracing::warn!(url, status = %response.status(), "font fetch failed, dropping font");
            return None;
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .filter(|v| !v.is_empty())
            .unwrap_or(DEFAULT_FONT_MIME)
            .to_string();

        match response.bytes().await {
            Ok(bytes) if !bytes.is_empty() => Some((content_type, bytes.to_vec())),
            Ok(_) => {
                tracing::warn!(url, "font response has no body, dropping font");
                None
            }
            Err(e) => {
                tracing::warn!(url, error = %e, "reading font body failed, dropping font");
                None
            }
        }
    }
}

/// Download `url` with `config` and no hooks
pub async fn download(url: &str, config: DownloaderConfig) -> Result<DownloadReport> {
    Downloader::new(url, config)?.execute().await
}

/// The source URL recorded on the first line of an existing stylesheet.
/// Bytes that are not UTF-8 are replaced, so a garbled file reads as changed.
async fn previous_source_url(path: &Path) -> Result<Option<String>> {
    match tokio::fs::read(path).await {
        Ok(content) => Ok(Some(source_url_from_comment(&String::from_utf8_lossy(&content)))),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(source) => Err(Error::Filesystem {
            path: path.to_path_buf(),
            source,
        }),
    }
}

fn source_url_from_comment(content: &str) -> String {
    content
        .lines()
        .next()
        .unwrap_or_default()
        .replacen("/*", "", 1)
        .replacen("*/", "", 1)
        .trim()
        .to_string()
}

async fn write_file(path: &Path, contents: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(fs_error(parent))?;
    }
    tokio::fs::write(path, contents)
        .await
        .map_err(fs_error(path))
}

fn fs_error(path: &Path) -> impl FnOnce(std::io::Error) -> Error {
    let path = path.to_path_buf();
    move |source| Error::Filesystem { path, source }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_user_agent() {
        let headers = DownloaderConfig::default().header_map().unwrap();
        assert_eq!(headers.get(USER_AGENT).unwrap(), DEFAULT_USER_AGENT);
    }

    #[test]
    fn test_custom_headers() {
        let config = DownloaderConfig {
            request_headers: vec![
                ("User-Agent".to_string(), "fontpull-test".to_string()),
                ("Accept".to_string(), "text/css".to_string()),
            ],
            ..Default::default()
        };
        let headers = config.header_map().unwrap();
        assert_eq!(headers.get_all(USER_AGENT).iter().count(), 1);
        assert_eq!(headers.get(USER_AGENT).unwrap(), "fontpull-test");
        assert_eq!(headers.get("accept").unwrap(), "text/css");
    }

    #[test]
    fn test_invalid_header_is_config_error() {
        let config = DownloaderConfig {
            request_headers: vec![("bad header".to_string(), "x".to_string())],
            ..Default::default()
        };
        assert!(matches!(config.header_map(), Err(Error::Config(_))));
        assert!(matches!(
            Downloader::new("https://fonts.googleapis.com/css2?family=Roboto", config),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn test_config_from_partial_json() {
        let config: DownloaderConfig = serde_json::from_str(
            r#"{ "inline_as_base64": true, "output_directory": "public", "request_headers": [["accept", "text/css"]] }"#,
        )
        .unwrap();
        assert!(config.inline_as_base64);
        assert_eq!(config.stylesheet_path(), PathBuf::from("public/fonts.css"));
        assert_eq!(config.fonts_directory(), PathBuf::from("public/fonts"));
        assert_eq!(config.api_host, GOOGLE_FONTS_HOST);
        assert_eq!(config.request_headers, vec![("accept".to_string(), "text/css".to_string())]);
    }

    #[test]
    fn test_source_url_from_comment() {
        assert_eq!(
            source_url_from_comment("/* https://fonts.googleapis.com/css2?family=Roboto */\n@font-face {}"),
            "https://fonts.googleapis.com/css2?family=Roboto"
        );
        assert_eq!(source_url_from_comment(""), "");
    }
}
