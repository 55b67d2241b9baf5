//! fontpull - Self-host Google Fonts
//!
//! Build and parse Google Fonts CSS API URLs, find the font files a stylesheet
//! references, and download everything into a local, rewritten stylesheet.
//!
//! # Features
//!
//! - `download` (default): fetch stylesheets and fonts with reqwest/tokio
//!
//! # Example
//!
//! ```ignore
//! use fontpull::{DownloaderConfig, GoogleFontsRequest, build_url, download, parse_url};
//!
//! let request = GoogleFontsRequest::new()
//!     .family("Roboto", vec![300u16, 700])
//!     .family("Lato", true);
//! let url = build_url(&request).expect("at least one family");
//! assert_eq!(parse_url(&url).families.len(), 2);
//!
//! let config = DownloaderConfig {
//!     output_directory: "public".into(),
//!     ..Default::default()
//! };
//! let report = download(&url, config).await?;
//! println!("wrote {}", report.stylesheet_path.display());
//! ```

mod api;
mod css;
#[cfg(feature = "download")]
mod download;
mod encode;
mod error;
mod family;
mod style;
mod template;

pub use api::{FontsApi, GOOGLE_FONTS_HOST};
pub use css::{
    DEFAULT_FILENAME_TEMPLATE, ExtractedFontFace, FontFaceExtractor, extract_font_faces,
    rewrite_css,
};
#[cfg(feature = "download")]
pub use download::{
    DEFAULT_FONT_MIME, DEFAULT_USER_AGENT, DownloadHooks, DownloadReport, DownloadedFont,
    Downloader, DownloaderConfig, NoHooks, download,
};
pub use encode::{ApiVersion, encode_families};
pub use error::{Error, Result};
pub use family::{AxisValue, FontFamilyQuery, GoogleFontsRequest, VariantSpec};
pub use style::{FontDisplay, ITAL, WGHT, parse_family_name, parse_style};
pub use template::render as render_template;

/// Build a stylesheet URL on `fonts.googleapis.com`; `None` if no family
/// could be encoded
pub fn build_url(request: &GoogleFontsRequest) -> Option<String> {
    FontsApi::default().build_url(request)
}

/// Parse a `fonts.googleapis.com` stylesheet URL back into a request
pub fn parse_url(url: &str) -> GoogleFontsRequest {
    FontsApi::default().parse_url(url)
}

/// Whether `url` points at `fonts.googleapis.com`
pub fn is_valid_url(url: &str) -> bool {
    FontsApi::default().is_valid_url(url)
}

/// Deep-merge several requests into one
pub fn merge(requests: impl IntoIterator<Item = GoogleFontsRequest>) -> GoogleFontsRequest {
    GoogleFontsRequest::merge_all(requests)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_and_parse_default_host() {
        let request = GoogleFontsRequest::new()
            .family("Roboto", VariantSpec::Weights(vec![300, 700]))
            .display(FontDisplay::Swap);
        let url = build_url(&request).unwrap();
        assert!(is_valid_url(&url));

        let parsed = parse_url(&url);
        assert_eq!(parsed.display, Some(FontDisplay::Swap));
        assert_eq!(parsed.families["Roboto"].weights(), request.families["Roboto"].weights());
    }

    #[test]
    fn test_merge() {
        let merged = merge([
            GoogleFontsRequest::new().family("Roboto", true),
            GoogleFontsRequest::new().family("Lato", true),
        ]);
        assert_eq!(
            build_url(&merged).as_deref(),
            Some("https://fonts.googleapis.com/css2?family=Lato&family=Roboto")
        );
    }
}
