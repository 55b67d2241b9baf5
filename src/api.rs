//! Building and parsing Google Fonts CSS API URLs

use std::collections::BTreeMap;
use std::sync::LazyLock;

use percent_encoding::{AsciiSet, CONTROLS, utf8_percent_encode};
use regex::Regex;
use url::Url;

use crate::encode::{ApiVersion, encode_families};
use crate::error::{Error, Result};
use crate::family::{AxisValue, FontFamilyQuery, GoogleFontsRequest, VariantSpec};
use crate::style::{FontDisplay, ITAL, WGHT, parse_style};

/// Host of the Google Fonts CSS API
pub const GOOGLE_FONTS_HOST: &str = "fonts.googleapis.com";

/// Characters escaped in query values. `:`, `@`, `;`, `,` and `|` stay readable
/// since they carry the family syntax.
const QUERY_VALUE: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'&')
    .add(b'+')
    .add(b'/')
    .add(b'<')
    .add(b'=')
    .add(b'>')
    .add(b'[')
    .add(b'\\')
    .add(b']')
    .add(b'^')
    .add(b'`')
    .add(b'{')
    .add(b'}');

static UNSIGNED_INT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\+?\d+$").expect("valid integer regex"));

/// A fonts API endpoint. Builds and parses URLs against its `host`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FontsApi {
    host: String,
}

impl Default for FontsApi {
    fn default() -> Self {
        Self::new(GOOGLE_FONTS_HOST)
    }
}

impl FontsApi {
    pub fn new(host: impl Into<String>) -> Self {
        Self { host: host.into() }
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    /// Whether `url` points at this API. This is a loose check: the URL's host
    /// only has to contain the configured host.
    pub fn is_valid_url(&self, url: &str) -> bool {
        Url::parse(url)
            .ok()
            .and_then(|url| url.host_str().map(|host| host.contains(&self.host)))
            .unwrap_or(false)
    }

    /// Build the stylesheet URL for `request`.
    ///
    /// Uses `/css` when subsets are requested (only v1 understands them) and
    /// `/css2` otherwise. Returns `None` if no family could be encoded.
    pub fn build_url(&self, request: &GoogleFontsRequest) -> Option<String> {
        let subsets: Vec<&str> = request
            .subsets
            .iter()
            .map(String::as_str)
            .filter(|s| !s.is_empty())
            .collect();
        let version = if subsets.is_empty() {
            ApiVersion::V2
        } else {
            ApiVersion::V1
        };

        let families = encode_families(&request.families, version);
        if families.is_empty() {
            return None;
        }

        let subset = subsets.join(",");
        let mut params: Vec<(&str, &str)> = families.iter().map(|f| ("family", f.as_str())).collect();
        if let Some(display) = request.display {
            params.push(("display", display.as_str()));
        }
        if !subset.is_empty() {
            params.push(("subset", subset.as_str()));
        }
        if let Some(text) = request.text.as_deref().filter(|t| !t.is_empty()) {
            params.push(("text", text));
        }

        let query = params
            .iter()
            .map(|(key, value)| format!("{key}={}", encode_query_value(value)))
            .collect::<Vec<_>>()
            .join("&");

        Some(format!("https://{}/{}?{}", self.host, version.path(), query))
    }

    /// Like [`FontsApi::build_url`], but an unconstructible request is an error
    pub fn try_build_url(&self, request: &GoogleFontsRequest) -> Result<String> {
        self.build_url(request).ok_or(Error::NotConstructible)
    }

    /// Recover a request from a stylesheet URL.
    ///
    /// Anything that is not a URL on this API, or has no usable `family`
    /// parameter, yields an empty request.
    pub fn parse_url(&self, url: &str) -> GoogleFontsRequest {
        if !self.is_valid_url(url) {
            return GoogleFontsRequest::default();
        }
        let Ok(parsed) = Url::parse(url) else {
            return GoogleFontsRequest::default();
        };

        let pairs: Vec<(String, String)> = parsed.query_pairs().into_owned().collect();
        let family_values: Vec<&str> = pairs
            .iter()
            .filter(|(key, _)| key == "family")
            .map(|(_, value)| value.as_str())
            .collect();
        if family_values.is_empty() {
            return GoogleFontsRequest::default();
        }

        let families = decode_families(&family_values, ApiVersion::from_path(parsed.path()));
        if families.is_empty() {
            return GoogleFontsRequest::default();
        }

        let first = |name: &str| {
            pairs
                .iter()
                .find(|(key, _)| key == name)
                .map(|(_, value)| value.as_str())
                .filter(|value| !value.is_empty())
        };

        GoogleFontsRequest {
            families,
            display: first("display").and_then(|d| d.parse::<FontDisplay>().ok()),
            subsets: first("subset")
                .map(|s| s.split(',').map(str::to_string).collect())
                .unwrap_or_default(),
            text: first("text").map(str::to_string),
        }
    }
}

fn encode_query_value(value: &str) -> String {
    utf8_percent_encode(value, QUERY_VALUE)
        .to_string()
        .replace("%20", "+")
}

/// Reverse of [`encode_families`]; `values` are the decoded `family=` params.
fn decode_families(values: &[&str], version: ApiVersion) -> FontFamilyQuery {
    let mut result = FontFamilyQuery::new();

    for family in values.iter().copied().flat_map(|v| v.split('|')) {
        if family.is_empty() {
            continue;
        }
        let Some((name, styles)) = family.split_once(':') else {
            result.insert(family.to_string(), VariantSpec::Present(true));
            continue;
        };
        // `Name:a:b` only ever looks at `a`
        let styles = styles.split(':').next().unwrap_or_default();
        if styles.is_empty() {
            continue;
        }

        let spec = match version {
            ApiVersion::V1 => decode_styles_v1(styles),
            ApiVersion::V2 => decode_styles_v2(styles),
        };
        result.insert(name.to_string(), spec);
    }

    result
}

fn decode_styles_v1(styles: &str) -> VariantSpec {
    let mut axes: BTreeMap<String, AxisValue> = BTreeMap::new();

    for style in styles.split(',') {
        let style = style.trim().to_ascii_lowercase();
        match parse_style(&style) {
            WGHT => {
                axes.insert(WGHT.to_string(), AxisValue::Flag(true));
            }
            ITAL => {
                axes.insert(ITAL.to_string(), AxisValue::Flag(true));
            }
            "bold" | "b" => {
                axes.insert(WGHT.to_string(), AxisValue::Weight(700));
            }
            "bolditalic" | "bi" => {
                axes.insert(ITAL.to_string(), AxisValue::Weight(700));
            }
            _ => {}
        }
    }

    if axes.is_empty() {
        VariantSpec::Present(true)
    } else {
        VariantSpec::Styles(axes)
    }
}

/// A weight token that survived filtering
enum WeightToken {
    Number(u16),
    Range(String),
}

fn decode_styles_v2(segment: &str) -> VariantSpec {
    let (styles, weights) = match segment.split_once('@') {
        Some((styles, weights)) if !weights.is_empty() => (styles.to_string(), weights.to_string()),
        // `Name:700` or `Name:300,700`: the segment is the weight list
        Some((styles, _)) => (WGHT.to_string(), styles.replacen(',', ";", 1)),
        None => (WGHT.to_string(), segment.replacen(',', ";", 1)),
    };

    let mut axes: BTreeMap<String, AxisValue> = BTreeMap::new();
    for style in styles.split(',') {
        let parsed = parse_style(style);
        let index = if parsed == WGHT { 0 } else { 1 };
        let tokens: Vec<WeightToken> = weights
            .split(';')
            .filter_map(|token| decode_weight_token(token, index))
            .collect();
        axes.insert(parsed.to_string(), collapse_tokens(tokens));
    }

    VariantSpec::Styles(axes)
}

/// Decode one `;`-separated token for the axis at `index`. Bare numbers apply
/// to every axis; `axis,value` pairs only to the matching one. Zero and
/// anything that is neither a number nor a range is dropped.
fn decode_weight_token(token: &str, index: u32) -> Option<WeightToken> {
    let token = token.trim();
    if UNSIGNED_INT.is_match(token) {
        return parse_weight(token).map(WeightToken::Number);
    }

    let mut parts = token.split(',');
    let pos = parts.next().unwrap_or_default();
    let Some(value) = parts.next() else {
        return token.contains("..").then(|| WeightToken::Range(token.to_string()));
    };
    if pos.trim().parse::<u32>().ok() != Some(index) {
        return None;
    }
    if UNSIGNED_INT.is_match(value) {
        return parse_weight(value).map(WeightToken::Number);
    }
    value.contains("..").then(|| WeightToken::Range(value.to_string()))
}

fn parse_weight(token: &str) -> Option<u16> {
    token
        .trim_start_matches('+')
        .parse::<u16>()
        .ok()
        .filter(|w| *w > 0)
}

fn collapse_tokens(tokens: Vec<WeightToken>) -> AxisValue {
    match tokens.as_slice() {
        [] | [WeightToken::Number(1)] => AxisValue::Flag(true),
        [WeightToken::Number(w)] => AxisValue::Weight(*w),
        [WeightToken::Range(r)] => AxisValue::Range(r.clone()),
        _ => {
            let numbers: Vec<u16> = tokens
                .iter()
                .filter_map(|t| match t {
                    WeightToken::Number(w) => Some(*w),
                    WeightToken::Range(_) => None,
                })
                .collect();
            if !numbers.is_empty() {
                return AxisValue::Weights(numbers);
            }
            // Several ranges and nothing else: keep the first
            match tokens.into_iter().next() {
                Some(WeightToken::Range(r)) => AxisValue::Range(r),
                _ => AxisValue::Flag(true),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn api() -> FontsApi {
        FontsApi::default()
    }

    #[test]
    fn test_build_css2_url() {
        let request = GoogleFontsRequest::new()
            .family("Roboto", vec![300u16, 700])
            .display(FontDisplay::Swap);
        assert_eq!(
            api().build_url(&request).as_deref(),
            Some("https://fonts.googleapis.com/css2?family=Roboto:wght@300;700&display=swap")
        );
    }

    #[test]
    fn test_build_one_param_per_family_in_v2() {
        let request = GoogleFontsRequest::new()
            .family("Open Sans", true)
            .family("Lato", "100..900");
        assert_eq!(
            api().build_url(&request).as_deref(),
            Some("https://fonts.googleapis.com/css2?family=Lato:wght@100..900&family=Open+Sans")
        );
    }

    #[test]
    fn test_build_with_subsets_uses_v1() {
        let request = GoogleFontsRequest::new()
            .family("Roboto", true)
            .family(
                "Lato",
                VariantSpec::styles([("wght", AxisValue::Weight(700))]),
            )
            .subset("latin")
            .subset("latin-ext")
            .text("Hello World&");
        assert_eq!(
            api().build_url(&request).as_deref(),
            Some(
                "https://fonts.googleapis.com/css?family=Lato:bold|Roboto&subset=latin,latin-ext&text=Hello+World%26"
            )
        );
    }

    #[test]
    fn test_build_without_families() {
        assert_eq!(api().build_url(&GoogleFontsRequest::new()), None);
        assert!(matches!(
            api().try_build_url(&GoogleFontsRequest::new().display(FontDisplay::Swap)),
            Err(Error::NotConstructible)
        ));
        let dropped = GoogleFontsRequest::new().family("Roboto", false);
        assert_eq!(api().build_url(&dropped), None);
    }

    #[test]
    fn test_build_with_custom_host() {
        let request = GoogleFontsRequest::new().family("Roboto", true);
        assert_eq!(
            FontsApi::new("fonts.bunny.net").build_url(&request).as_deref(),
            Some("https://fonts.bunny.net/css2?family=Roboto")
        );
    }

    #[test]
    fn test_is_valid_url() {
        assert!(api().is_valid_url("https://fonts.googleapis.com/css2?family=Roboto"));
        assert!(api().is_valid_url("http://fonts.googleapis.com/css?family=Roboto"));
        assert!(!api().is_valid_url("https://example.com/css2?family=Roboto"));
        assert!(!api().is_valid_url("not a url"));
    }

    #[test]
    fn test_parse_css2_weights() {
        let request = api().parse_url("https://fonts.googleapis.com/css2?family=Roboto:wght@300;700");
        assert_eq!(
            request,
            GoogleFontsRequest::new().family(
                "Roboto",
                VariantSpec::styles([("wght", AxisValue::Weights(vec![300, 700]))])
            )
        );
    }

    #[test]
    fn test_parse_css2_axis_tuples() {
        let request = api().parse_url(
            "https://fonts.googleapis.com/css2?family=Crimson+Pro:ital,wght@0,200..900;1,200..900&family=Roboto&display=swap",
        );
        assert_eq!(request.display, Some(FontDisplay::Swap));
        assert_eq!(request.families["Roboto"], VariantSpec::Present(true));
        assert_eq!(
            request.families["Crimson Pro"],
            VariantSpec::styles([
                ("ital", AxisValue::Range("200..900".to_string())),
                ("wght", AxisValue::Range("200..900".to_string())),
            ])
        );
    }

    #[test]
    fn test_parse_css2_regular_and_single() {
        let request = api().parse_url("https://fonts.googleapis.com/css2?family=Lato:ital@1&family=Inter:700");
        assert_eq!(
            request.families["Lato"],
            VariantSpec::styles([("ital", AxisValue::Flag(true))])
        );
        assert_eq!(
            request.families["Inter"],
            VariantSpec::styles([("wght", AxisValue::Weight(700))])
        );
    }

    #[test]
    fn test_parse_drops_mismatched_and_zero_tokens() {
        let request =
            api().parse_url("https://fonts.googleapis.com/css2?family=Roboto:ital,wght@0,400;1,700;0,0;abc");
        assert_eq!(
            request.families["Roboto"],
            VariantSpec::styles([
                ("ital", AxisValue::Weight(700)),
                ("wght", AxisValue::Weight(400)),
            ])
        );
    }

    #[test]
    fn test_parse_css_v1() {
        let request = api().parse_url(
            "https://fonts.googleapis.com/css?family=Lato:bold,i|Roboto&subset=latin,cyrillic&text=Hi&display=nope",
        );
        assert_eq!(request.families["Roboto"], VariantSpec::Present(true));
        assert_eq!(
            request.families["Lato"],
            VariantSpec::styles([
                ("ital", AxisValue::Flag(true)),
                ("wght", AxisValue::Weight(700)),
            ])
        );
        assert_eq!(request.subsets, vec!["latin", "cyrillic"]);
        assert_eq!(request.text.as_deref(), Some("Hi"));
        assert_eq!(request.display, None);
    }

    #[test]
    fn test_parse_decodes_family_names_once() {
        let request = api().parse_url(
            "https://fonts.googleapis.com/css2?family=A%2541&family=Open+Sans:wght@700&family=B%2B1",
        );
        let names: Vec<&str> = request.families.keys().map(String::as_str).collect();
        assert_eq!(names, vec!["A%41", "B+1", "Open Sans"]);
        assert_eq!(
            request.families["Open Sans"],
            VariantSpec::styles([("wght", AxisValue::Weight(700))])
        );
    }

    #[test]
    fn test_parse_rejects_foreign_and_familyless_urls() {
        assert!(api().parse_url("https://example.com/css2?family=Roboto").is_empty());
        assert!(api().parse_url("https://fonts.googleapis.com/css2?display=swap").is_empty());
        assert!(api().parse_url("https://fonts.googleapis.com/css2?family=").is_empty());
    }

    #[test]
    fn test_weights_survive_round_trip() {
        let specs = [
            VariantSpec::Weights(vec![300, 700]),
            VariantSpec::Weights(vec![100, 400, 900]),
            VariantSpec::Weight(500),
            VariantSpec::styles([("wght", AxisValue::Weights(vec![200, 800]))]),
        ];
        for spec in specs {
            let request = GoogleFontsRequest::new().family("Roboto", spec.clone());
            let url = api().build_url(&request).unwrap();
            let parsed = api().parse_url(&url);
            assert_eq!(parsed.families["Roboto"].weights(), spec.weights(), "{url}");
        }
    }

    #[test]
    fn test_round_trip_display_subsets_text() {
        let request = GoogleFontsRequest::new()
            .family("Open Sans", true)
            .display(FontDisplay::Fallback)
            .subset("greek")
            .text("a+b c");
        let url = api().build_url(&request).unwrap();
        assert_eq!(api().parse_url(&url), request);
    }
}
