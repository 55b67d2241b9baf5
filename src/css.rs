//! Discovery of `@font-face` sources in a stylesheet, and the rewrite that
//! points them at self-hosted copies.

use std::borrow::Cow;
use std::collections::HashSet;
use std::path::{Component, Path};
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;
use url::Url;

use crate::template::render;

/// Filename template used for downloaded fonts
pub const DEFAULT_FILENAME_TEMPLATE: &str = "{_family}-{weight}-{i}.{ext}";

/// An `@font-face` block, optionally preceded by a `/* comment */` (Google
/// labels each block with its subset this way).
static FACE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\s*(?:/\*\s*(.*?)\s*\*/)?[^@]*?@font-face\s*\{([^}]*?)\}\s*")
        .expect("valid @font-face regex")
});
static FAMILY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)font-family\s*:\s*(?:'|")?([^;]*?)(?:'|")?\s*;"#).expect("valid font-family regex")
});
static WEIGHT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)font-weight\s*:\s*([^;]*?)\s*;").expect("valid font-weight regex")
});
static URL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)url\s*\(\s*(?:'|")?\s*((?s:.)*?)\s*(?:'|")?\s*\)"#).expect("valid url regex")
});
static WHITESPACE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("valid whitespace regex"));

/// One remote font file referenced from an `@font-face` rule
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExtractedFontFace {
    /// `font-family` of the enclosing rule, unquoted
    pub family: String,
    /// Raw `font-weight` value (`400`, `100 900`, `bold`, ...)
    pub weight: String,
    /// Remote URL of the font file
    pub source_url: String,
    /// Extension without the leading dot
    pub file_extension: String,
    /// Local filename, unique within one extraction
    pub generated_filename: String,
    /// The literal `url(...)` token found in the stylesheet
    pub css_match_text: String,
    /// What `css_match_text` is replaced with
    pub replacement_text: String,
}

/// Scans stylesheets for font URLs and names their local copies
#[derive(Debug, Clone)]
pub struct FontFaceExtractor {
    fonts_url_prefix: String,
    template: String,
}

impl FontFaceExtractor {
    /// `fonts_url_prefix` is what the rewritten stylesheet uses to reach the
    /// fonts directory (`./fonts`, `/assets/fonts`, ...)
    pub fn new(fonts_url_prefix: impl Into<String>) -> Self {
        Self {
            fonts_url_prefix: fonts_url_prefix.into(),
            template: DEFAULT_FILENAME_TEMPLATE.to_string(),
        }
    }

    /// Use another filename template. Available keys: `comment`, `family`,
    /// `_family`, `weight`, `filename`, `ext` and `i`.
    ///
    /// Values taken from the stylesheet never contain path separators. A name
    /// that repeats within one extraction gets `-{i}` appended to its stem.
    pub fn with_template(mut self, template: impl Into<String>) -> Self {
        self.template = template.into();
        self
    }

    /// Extract every font URL of every `@font-face` rule in `css`.
    ///
    /// URLs whose path has no real extension, or that do not parse as absolute
    /// URLs, are skipped. So are fonts whose rendered name would leave the
    /// fonts directory. The `{i}` counter runs across the whole document.
    pub fn extract(&self, css: &str) -> Vec<ExtractedFontFace> {
        let mut fonts = Vec::new();
        let mut seen = HashSet::new();
        let mut i = 1usize;

        for face in FACE_RE.captures_iter(css) {
            let comment = face.get(1).map_or("", |m| m.as_str());
            let block = face.get(2).map_or("", |m| m.as_str());

            let family = first_capture(&FAMILY_RE, block);
            let weight = first_capture(&WEIGHT_RE, block);
            let underscored_family = WHITESPACE_RE.replace_all(family, "_");

            for url_match in URL_RE.captures_iter(block) {
                let css_match_text = &url_match[0];
                let source_url = url_match.get(1).map_or("", |m| m.as_str());

                let Ok(parsed) = Url::parse(source_url) else {
                    tracing::debug!(url = source_url, "skipping unparseable font URL");
                    continue;
                };
                let basename = parsed.path().rsplit('/').next().unwrap_or_default();
                let (stem, ext) = split_extension(basename);
                if ext.len() < 2 {
                    tracing::debug!(url = source_url, "skipping font URL without extension");
                    continue;
                }
                let ext = ext.trim_start_matches('.');

                let index = i.to_string();
                i += 1;
                let rendered = render(
                    &self.template,
                    [
                        ("comment", path_safe(comment)),
                        ("family", path_safe(family)),
                        ("weight", path_safe(weight)),
                        ("filename", path_safe(stem)),
                        ("_family", path_safe(&underscored_family)),
                        ("ext", path_safe(ext)),
                        ("i", Cow::Borrowed(index.as_str())),
                    ],
                );
                let rendered = rendered.strip_suffix('.').unwrap_or(&rendered);
                if !is_contained(rendered) {
                    tracing::warn!(
                        url = source_url,
                        name = rendered,
                        "font filename escapes the fonts directory, skipping"
                    );
                    continue;
                }
                let generated_filename = unique_name(rendered, &index, &mut seen);
                let replacement_text = format!(
                    "url('{}')",
                    join_url_path(&self.fonts_url_prefix, &generated_filename)
                );

                fonts.push(ExtractedFontFace {
                    family: family.to_string(),
                    weight: weight.to_string(),
                    source_url: source_url.to_string(),
                    file_extension: ext.to_string(),
                    generated_filename,
                    css_match_text: css_match_text.to_string(),
                    replacement_text,
                });
            }
        }

        fonts
    }
}

/// Extract fonts with the default filename template
pub fn extract_font_faces(css: &str, fonts_url_prefix: &str) -> Vec<ExtractedFontFace> {
    FontFaceExtractor::new(fonts_url_prefix).extract(css)
}

/// Swap each font's original `url(...)` token for its replacement.
///
/// Plain substring replacement, first occurrence only, in the order given.
pub fn rewrite_css(css: &str, fonts: &[ExtractedFontFace]) -> String {
    fonts.iter().fold(css.to_string(), |content, font| {
        content.replacen(&font.css_match_text, &font.replacement_text, 1)
    })
}

/// Stylesheet values end up in filenames; keep them to one path segment
fn path_safe(value: &str) -> Cow<'_, str> {
    if value.contains(['/', '\\']) {
        Cow::Owned(value.replace(['/', '\\'], "_"))
    } else {
        Cow::Borrowed(value)
    }
}

/// A relative path that stays below the directory it is joined to
fn is_contained(name: &str) -> bool {
    !name.is_empty()
        && Path::new(name)
            .components()
            .all(|c| matches!(c, Component::Normal(_) | Component::CurDir))
}

fn unique_name(name: &str, index: &str, seen: &mut HashSet<String>) -> String {
    let mut name = name.to_string();
    while seen.contains(&name) {
        let (stem, ext) = split_extension(&name);
        name = format!("{stem}-{index}{ext}");
    }
    seen.insert(name.clone());
    name
}

fn first_capture<'a>(re: &Regex, haystack: &'a str) -> &'a str {
    re.captures(haystack)
        .and_then(|caps| caps.get(1))
        .map_or("", |m| m.as_str())
}

/// Split `name.ext` into `("name", ".ext")`. Dotfiles have no extension.
fn split_extension(basename: &str) -> (&str, &str) {
    match basename.rfind('.') {
        Some(dot) if dot > 0 => basename.split_at(dot),
        _ => (basename, ""),
    }
}

/// Join with forward slashes and normalize `.`/`..` segments, whatever the
/// host OS. Absolute URL prefixes are only joined, never normalized.
fn join_url_path(prefix: &str, name: &str) -> String {
    if prefix.contains("://") {
        return format!("{}/{}", prefix.trim_end_matches('/'), name);
    }

    let joined = format!("{prefix}/{name}");
    let absolute = joined.starts_with('/');
    let mut segments: Vec<&str> = Vec::new();
    for segment in joined.split('/') {
        match segment {
            "" | "." => {}
            ".." => match segments.last() {
                Some(last) if *last != ".." => {
                    segments.pop();
                }
                _ if !absolute => segments.push(".."),
                _ => {}
            },
            segment => segments.push(segment),
        }
    }

    let path = segments.join("/");
    if absolute {
        format!("/{path}")
    } else if path.is_empty() {
        ".".to_string()
    } else {
        path
    }
}
