//! Encoding of a [`FontFamilyQuery`] into `family=` query values
//!
//! Version 1 (`/css`) packs every family into a single `|`-separated value and
//! only knows about regular, bold and italic. Version 2 (`/css2`) emits one
//! value per family with explicit axis tuples.

use crate::family::{AxisValue, FontFamilyQuery, VariantSpec};
use crate::style::{ITAL, WGHT, parse_family_name, parse_style};

/// Which flavour of the CSS API to target
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiVersion {
    /// `https://fonts.googleapis.com/css`, required for `subset=`
    V1,
    /// `https://fonts.googleapis.com/css2`
    V2,
}

impl ApiVersion {
    /// Path segment on the API host
    pub fn path(&self) -> &'static str {
        match self {
            ApiVersion::V1 => "css",
            ApiVersion::V2 => "css2",
        }
    }

    /// Guess the version from a URL path (`/css2` vs `/css`)
    pub fn from_path(path: &str) -> Self {
        if path.ends_with('2') {
            ApiVersion::V2
        } else {
            ApiVersion::V1
        }
    }
}

/// Encode families into `family=` values for the given API version.
///
/// V1 yields at most one value; an empty result means no family produced output.
pub fn encode_families(families: &FontFamilyQuery, version: ApiVersion) -> Vec<String> {
    match version {
        ApiVersion::V1 => {
            let encoded: Vec<String> = families
                .iter()
                .filter(|(name, _)| !name.is_empty())
                .filter_map(|(name, spec)| encode_family_v1(&parse_family_name(name), spec))
                .collect();
            if encoded.is_empty() {
                Vec::new()
            } else {
                vec![encoded.join("|")]
            }
        }
        ApiVersion::V2 => families
            .iter()
            .filter(|(name, _)| !name.is_empty())
            .filter_map(|(name, spec)| encode_family_v2(&parse_family_name(name), spec))
            .collect(),
    }
}

fn encode_family_v1(name: &str, spec: &VariantSpec) -> Option<String> {
    match spec {
        VariantSpec::Present(false) => None,
        VariantSpec::Weight(700) => Some(format!("{name}:bold")),
        // v1 cannot express other single weights or ranges; keep the family
        VariantSpec::Present(true) | VariantSpec::Weight(_) | VariantSpec::Range(_) => {
            Some(name.to_string())
        }
        VariantSpec::Weights(_) => Some(name.to_string()),
        VariantSpec::Styles(axes) if axes.is_empty() => Some(name.to_string()),
        VariantSpec::Styles(axes) => {
            let mut styles: Vec<&str> = Vec::new();
            for (style, value) in axes {
                let parsed = parse_style(style);
                if parsed == ITAL && value.carries(700) {
                    styles.push("bolditalic");
                    if matches!(value, AxisValue::Weights(_)) && value.carries(400) {
                        styles.push(ITAL);
                    }
                } else if parsed == WGHT && value.carries(700) {
                    styles.push("bold");
                    if matches!(value, AxisValue::Weights(_)) && value.carries(400) {
                        styles.push(WGHT);
                    }
                } else if *value != AxisValue::Flag(false) {
                    styles.push(parsed);
                }
            }

            // Ordered by leading letter only (stable), then reversed:
            // `wght,ital,bold,bolditalic`.
            styles.sort_by_key(|s| s.chars().next());
            styles.reverse();
            let styles = styles.join(",");

            if styles.is_empty() || styles == WGHT {
                Some(name.to_string())
            } else {
                Some(format!("{name}:{styles}"))
            }
        }
    }
}

fn encode_family_v2(name: &str, spec: &VariantSpec) -> Option<String> {
    match spec {
        VariantSpec::Present(false) => None,
        VariantSpec::Present(true) => Some(name.to_string()),
        VariantSpec::Weight(0) => Some(name.to_string()),
        VariantSpec::Weight(weight) => Some(format!("{name}:wght@{weight}")),
        VariantSpec::Range(range) if range.contains("..") => Some(format!("{name}:wght@{range}")),
        VariantSpec::Range(_) => Some(name.to_string()),
        VariantSpec::Weights(weights) if weights.is_empty() => Some(name.to_string()),
        VariantSpec::Weights(weights) => {
            let weights: Vec<String> = weights.iter().map(u16::to_string).collect();
            Some(format!("{name}:wght@{}", weights.join(";")))
        }
        VariantSpec::Styles(axes) if axes.is_empty() => Some(name.to_string()),
        VariantSpec::Styles(axes) => {
            let sole_axis = axes.len() == 1;
            let mut styles: Vec<&str> = Vec::new();
            let mut weights: Vec<String> = Vec::new();
            let mut force_wght = false;

            for (style, value) in axes {
                let parsed = parse_style(style);
                styles.push(parsed);

                let tokens = axis_tokens(value);
                let sole_value = tokens.len() == 1;
                for token in &tokens {
                    if sole_axis && parsed == WGHT {
                        if let Some(bare) = token.bare() {
                            weights.push(bare);
                        }
                        continue;
                    }

                    let index = if parsed == WGHT { 0 } else { 1 };
                    if sole_axis && sole_value && token.is_regular() {
                        weights.push(index.to_string());
                    } else if let Some(tuple) = token.tuple_value(parsed) {
                        force_wght = true;
                        weights.push(format!("{index},{tuple}"));
                    }
                }
            }

            if force_wght && !styles.contains(&WGHT) {
                styles.push(WGHT);
            }
            if weights.is_empty() {
                return Some(name.to_string());
            }
            weights.sort();

            Some(format!("{name}:{}@{}", styles.join(","), weights.join(";")))
        }
    }
}

/// One value carried by an axis, flattened out of [`AxisValue`]
enum AxisToken<'a> {
    Flag(bool),
    Weight(u16),
    Range(&'a str),
}

impl AxisToken<'_> {
    /// `true`, `1` and `400` all mean "the regular style"
    fn is_regular(&self) -> bool {
        matches!(self, AxisToken::Flag(true) | AxisToken::Weight(1) | AxisToken::Weight(400))
    }

    /// Rendering when the weight axis is the only axis
    fn bare(&self) -> Option<String> {
        match self {
            AxisToken::Flag(true) => Some("400".to_string()),
            AxisToken::Flag(false) | AxisToken::Weight(0) => None,
            AxisToken::Weight(w) => Some(w.to_string()),
            AxisToken::Range(r) => Some(r.to_string()),
        }
    }

    /// Value half of an `axis,value` tuple; falsy values are dropped
    fn tuple_value(&self, axis: &str) -> Option<String> {
        match self {
            AxisToken::Flag(true) if axis == WGHT => Some("400".to_string()),
            AxisToken::Flag(true) => Some("1".to_string()),
            AxisToken::Flag(false) | AxisToken::Weight(0) => None,
            AxisToken::Weight(w) => Some(w.to_string()),
            AxisToken::Range(r) if r.is_empty() => None,
            AxisToken::Range(r) => Some(r.to_string()),
        }
    }
}

fn axis_tokens(value: &AxisValue) -> Vec<AxisToken<'_>> {
    match value {
        AxisValue::Flag(flag) => vec![AxisToken::Flag(*flag)],
        AxisValue::Weight(w) => vec![AxisToken::Weight(*w)],
        AxisValue::Weights(ws) => ws.iter().map(|w| AxisToken::Weight(*w)).collect(),
        AxisValue::Range(r) => vec![AxisToken::Range(r)],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn one(name: &str, spec: VariantSpec) -> FontFamilyQuery {
        FontFamilyQuery::from([(name.to_string(), spec)])
    }

    #[test]
    fn test_v2_plain_families() {
        assert_eq!(
            encode_families(&one("Roboto", VariantSpec::Present(true)), ApiVersion::V2),
            vec!["Roboto"]
        );
        assert_eq!(
            encode_families(&one("Roboto", VariantSpec::Weights(vec![300, 700])), ApiVersion::V2),
            vec!["Roboto:wght@300;700"]
        );
        assert_eq!(
            encode_families(&one("Roboto", VariantSpec::Range("100..900".into())), ApiVersion::V2),
            vec!["Roboto:wght@100..900"]
        );
        assert!(encode_families(&one("Roboto", VariantSpec::Present(false)), ApiVersion::V2).is_empty());
    }

    #[test]
    fn test_v2_family_name_is_decoded() {
        assert_eq!(
            encode_families(&one("Open+Sans", VariantSpec::Present(true)), ApiVersion::V2),
            vec!["Open Sans"]
        );
    }

    #[test]
    fn test_v2_styles() {
        let spec = VariantSpec::styles([("wght", AxisValue::Weights(vec![400, 700]))]);
        assert_eq!(
            encode_families(&one("Roboto", spec), ApiVersion::V2),
            vec!["Roboto:wght@400;700"]
        );

        let spec = VariantSpec::styles([("ital", AxisValue::Flag(true))]);
        assert_eq!(
            encode_families(&one("Roboto", spec), ApiVersion::V2),
            vec!["Roboto:ital@1"]
        );

        // A lone italic weight forces the weight axis in
        let spec = VariantSpec::styles([("italic", AxisValue::Weight(700))]);
        assert_eq!(
            encode_families(&one("Roboto", spec), ApiVersion::V2),
            vec!["Roboto:ital,wght@1,700"]
        );

        let spec = VariantSpec::styles([
            ("wght", AxisValue::Weights(vec![400, 700])),
            ("ital", AxisValue::Weights(vec![400, 700])),
        ]);
        assert_eq!(
            encode_families(&one("Roboto", spec), ApiVersion::V2),
            vec!["Roboto:ital,wght@0,400;0,700;1,400;1,700"]
        );
    }

    #[test]
    fn test_v2_regular_weight_flag_in_tuple() {
        let spec = VariantSpec::styles([
            ("wght", AxisValue::Flag(true)),
            ("ital", AxisValue::Flag(true)),
        ]);
        assert_eq!(
            encode_families(&one("Roboto", spec), ApiVersion::V2),
            vec!["Roboto:ital,wght@0,400;1,1"]
        );
    }

    #[test]
    fn test_v2_multiple_families() {
        let families = FontFamilyQuery::from([
            ("Roboto".to_string(), VariantSpec::Present(true)),
            ("Lato".to_string(), VariantSpec::Weights(vec![100, 900])),
        ]);
        assert_eq!(
            encode_families(&families, ApiVersion::V2),
            vec!["Lato:wght@100;900", "Roboto"]
        );
    }

    #[test]
    fn test_v1_bold_and_regular() {
        let spec = VariantSpec::styles([("wght", AxisValue::Weight(700))]);
        assert_eq!(encode_families(&one("Roboto", spec), ApiVersion::V1), vec!["Roboto:bold"]);

        let spec = VariantSpec::styles([("wght", AxisValue::Weight(400))]);
        assert_eq!(encode_families(&one("Roboto", spec), ApiVersion::V1), vec!["Roboto"]);

        assert_eq!(
            encode_families(&one("Roboto", VariantSpec::Weight(700)), ApiVersion::V1),
            vec!["Roboto:bold"]
        );
        assert_eq!(
            encode_families(&one("Roboto", VariantSpec::Weights(vec![300, 700])), ApiVersion::V1),
            vec!["Roboto"]
        );
    }

    #[test]
    fn test_v1_all_styles() {
        let spec = VariantSpec::styles([
            ("wght", AxisValue::Weights(vec![400, 700])),
            ("ital", AxisValue::Weights(vec![400, 700])),
        ]);
        assert_eq!(
            encode_families(&one("Roboto", spec), ApiVersion::V1),
            vec!["Roboto:wght,ital,bold,bolditalic"]
        );

        let spec = VariantSpec::styles([
            ("wght", AxisValue::Flag(true)),
            ("ital", AxisValue::Flag(false)),
        ]);
        assert_eq!(encode_families(&one("Roboto", spec), ApiVersion::V1), vec!["Roboto"]);
    }

    #[test]
    fn test_v1_packs_families() {
        let families = FontFamilyQuery::from([
            ("Roboto".to_string(), VariantSpec::Present(true)),
            (
                "Lato".to_string(),
                VariantSpec::styles([("ital", AxisValue::Flag(true))]),
            ),
        ]);
        assert_eq!(encode_families(&families, ApiVersion::V1), vec!["Lato:ital|Roboto"]);
        assert!(encode_families(&FontFamilyQuery::new(), ApiVersion::V1).is_empty());
    }
}
