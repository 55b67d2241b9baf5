use std::path::Path;

use fontpull::{DownloadHooks, ExtractedFontFace};

/// Logs each step of a download run
pub struct LogHooks;

impl DownloadHooks for LogHooks {
    fn before_css_fetch(&self, url: &str) {
        tracing::info!("Fetching stylesheet: {}", url);
    }

    fn after_css_fetch(&self, _url: &str, css: &str, fonts: &[ExtractedFontFace]) {
        tracing::info!("Found {} font files in {} bytes of CSS", fonts.len(), css.len());
    }

    fn after_font_fetch(&self, font: &ExtractedFontFace) {
        tracing::info!(
            "Fetched {} {}: {}",
            font.family,
            font.weight,
            font.generated_filename
        );
    }

    fn after_css_write(&self, path: &Path, new_css: &str, _old_css: &str) {
        tracing::info!("Created: {} ({} bytes)", path.display(), new_css.len());
    }
}
