//! Tiny `{key}` template renderer used for generated font filenames

use std::sync::LazyLock;

use regex::{Captures, Regex};

static VALID_KEY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^[a-z0-9_-]+$").expect("valid key regex"));

static DOUBLED_BRACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[{}]{2}").expect("valid brace regex"));

/// Substitute `{key}` placeholders in `template`.
///
/// Keys that are not `[a-z0-9_-]+` are ignored, as are placeholders wrapped in
/// another brace (`{{key}}`). Unknown placeholders are left untouched. Doubled
/// braces collapse to one at the end, so `{{` and `}}` are literal braces.
pub fn render<I, K, V>(template: &str, values: I) -> String
where
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<str>,
    V: AsRef<str>,
{
    let rendered = values
        .into_iter()
        .filter(|(key, _)| VALID_KEY.is_match(key.as_ref()))
        .fold(template.to_string(), |acc, (key, value)| {
            substitute(&acc, key.as_ref(), value.as_ref())
        });

    DOUBLED_BRACE
        .replace_all(&rendered, |caps: &Captures| {
            // keep the second brace of the pair
            caps[0][1..].to_string()
        })
        .into_owned()
}

/// Replace every `{key}` in `text` that is not directly wrapped in another brace
fn substitute(text: &str, key: &str, value: &str) -> String {
    let placeholder = format!("{{{key}}}");
    let mut out = String::with_capacity(text.len());
    let mut copied = 0;

    for (start, _) in text.match_indices(&placeholder) {
        let end = start + placeholder.len();
        let escaped = text[..start].ends_with('{') || text[end..].starts_with('}');
        if escaped {
            continue;
        }
        out.push_str(&text[copied..start]);
        out.push_str(value);
        copied = end;
    }
    out.push_str(&text[copied..]);
    out
}
