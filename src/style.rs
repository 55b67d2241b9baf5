//! Normalization of style tokens, family names and display strategies

use std::fmt;
use std::str::FromStr;

use percent_encoding::percent_decode_str;
use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Weight axis tag
pub const WGHT: &str = "wght";
/// Italic axis tag
pub const ITAL: &str = "ital";

/// Canonicalize a style token.
///
/// `wght`, `regular` and `normal` map to `wght`; `i`, `italic` and `ital` map
/// to `ital`. Anything else (`bold`, `bolditalic`, ...) is returned as-is.
pub fn parse_style(style: &str) -> &str {
    match style.to_ascii_lowercase().as_str() {
        "wght" | "regular" | "normal" => WGHT,
        "i" | "italic" | "ital" => ITAL,
        _ => style,
    }
}

/// Decode a family name as it appears in a URL (`Open+Sans`, `Open%20Sans`)
pub fn parse_family_name(name: &str) -> String {
    percent_decode_str(name)
        .decode_utf8_lossy()
        .replace('+', " ")
}

/// The `font-display` strategies accepted by the API
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FontDisplay {
    Auto,
    Block,
    Swap,
    Fallback,
    Optional,
}

impl FontDisplay {
    pub const ALL: [FontDisplay; 5] = [
        FontDisplay::Auto,
        FontDisplay::Block,
        FontDisplay::Swap,
        FontDisplay::Fallback,
        FontDisplay::Optional,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FontDisplay::Auto => "auto",
            FontDisplay::Block => "block",
            FontDisplay::Swap => "swap",
            FontDisplay::Fallback => "fallback",
            FontDisplay::Optional => "optional",
        }
    }
}

impl fmt::Display for FontDisplay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FontDisplay {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        FontDisplay::ALL
            .into_iter()
            .find(|d| d.as_str() == s)
            .ok_or_else(|| Error::InvalidDisplay(s.to_string()))
    }
}
