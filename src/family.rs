//! Structured description of a Google Fonts request

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::style::{FontDisplay, WGHT, parse_style};

/// Family display name -> requested variants.
///
/// A `BTreeMap` so the encoded URL is reproducible regardless of insertion order.
pub type FontFamilyQuery = BTreeMap<String, VariantSpec>;

/// What to request for a single family
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum VariantSpec {
    /// `true` requests the regular style only; `false` drops the family
    Present(bool),
    /// One static weight
    Weight(u16),
    /// Several static weights
    Weights(Vec<u16>),
    /// A variable weight range, `"<low>..<high>"`
    Range(String),
    /// Per-axis values, keyed by style name (`wght`, `ital`, or an alias)
    Styles(BTreeMap<String, AxisValue>),
}

/// Value of one axis inside [`VariantSpec::Styles`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AxisValue {
    Flag(bool),
    Weight(u16),
    Weights(Vec<u16>),
    Range(String),
}

impl AxisValue {
    /// Whether this axis explicitly carries the numeric weight `weight`
    pub fn carries(&self, weight: u16) -> bool {
        match self {
            AxisValue::Weight(w) => *w == weight,
            AxisValue::Weights(ws) => ws.contains(&weight),
            AxisValue::Flag(_) | AxisValue::Range(_) => false,
        }
    }

    fn merge(self, other: AxisValue) -> AxisValue {
        match (self, other) {
            (AxisValue::Weights(mut a), AxisValue::Weights(b)) => {
                extend_unique(&mut a, b);
                AxisValue::Weights(a)
            }
            (_, other) => other,
        }
    }
}

impl VariantSpec {
    /// Build a style mapping from `(axis, value)` pairs
    pub fn styles<K, I>(axes: I) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, AxisValue)>,
    {
        VariantSpec::Styles(axes.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    /// The explicit numeric weights this spec asks for on the weight axis.
    ///
    /// Flags and ranges contribute nothing; use this to compare two specs
    /// that differ only in representation (`[300, 700]` vs `{wght: [300, 700]}`).
    pub fn weights(&self) -> BTreeSet<u16> {
        match self {
            VariantSpec::Weight(w) => BTreeSet::from([*w]),
            VariantSpec::Weights(ws) => ws.iter().copied().collect(),
            VariantSpec::Styles(axes) => axes
                .iter()
                .filter(|(style, _)| parse_style(style) == WGHT)
                .flat_map(|(_, value)| match value {
                    AxisValue::Weight(w) => vec![*w],
                    AxisValue::Weights(ws) => ws.clone(),
                    AxisValue::Flag(_) | AxisValue::Range(_) => Vec::new(),
                })
                .collect(),
            VariantSpec::Present(_) | VariantSpec::Range(_) => BTreeSet::new(),
        }
    }

    /// Deep merge: style mappings merge per axis, weight lists concatenate,
    /// anything else is replaced by `other`.
    pub fn merge(self, other: VariantSpec) -> VariantSpec {
        match (self, other) {
            (VariantSpec::Styles(mut a), VariantSpec::Styles(b)) => {
                for (axis, value) in b {
                    let merged = match a.remove(&axis) {
                        Some(existing) => existing.merge(value),
                        None => value,
                    };
                    a.insert(axis, merged);
                }
                VariantSpec::Styles(a)
            }
            (VariantSpec::Weights(mut a), VariantSpec::Weights(b)) => {
                extend_unique(&mut a, b);
                VariantSpec::Weights(a)
            }
            (_, other) => other,
        }
    }
}

impl From<bool> for VariantSpec {
    fn from(value: bool) -> Self {
        VariantSpec::Present(value)
    }
}

impl From<u16> for VariantSpec {
    fn from(value: u16) -> Self {
        VariantSpec::Weight(value)
    }
}

impl From<Vec<u16>> for VariantSpec {
    fn from(value: Vec<u16>) -> Self {
        VariantSpec::Weights(value)
    }
}

impl From<&str> for VariantSpec {
    fn from(value: &str) -> Self {
        VariantSpec::Range(value.to_string())
    }
}

/// Everything needed to build a Google Fonts CSS API URL
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GoogleFontsRequest {
    pub families: FontFamilyQuery,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display: Option<FontDisplay>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub subsets: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

impl GoogleFontsRequest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn family(mut self, name: impl Into<String>, spec: impl Into<VariantSpec>) -> Self {
        self.families.insert(name.into(), spec.into());
        self
    }

    pub fn display(mut self, display: FontDisplay) -> Self {
        self.display = Some(display);
        self
    }

    pub fn subset(mut self, subset: impl Into<String>) -> Self {
        self.subsets.push(subset.into());
        self
    }

    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    /// True when the request carries nothing at all (what `parse` returns for
    /// URLs it does not understand)
    pub fn is_empty(&self) -> bool {
        self.families.is_empty()
            && self.display.is_none()
            && self.subsets.is_empty()
            && self.text.is_none()
    }

    /// Deep-merge `other` into this request. Later values win for `display`
    /// and `text`; subsets are concatenated without duplicates.
    pub fn merge(mut self, other: GoogleFontsRequest) -> Self {
        for (name, spec) in other.families {
            let merged = match self.families.remove(&name) {
                Some(existing) => existing.merge(spec),
                None => spec,
            };
            self.families.insert(name, merged);
        }
        if other.display.is_some() {
            self.display = other.display;
        }
        extend_unique(&mut self.subsets, other.subsets);
        if other.text.is_some() {
            self.text = other.text;
        }
        self
    }

    /// Merge several requests, left to right
    pub fn merge_all(requests: impl IntoIterator<Item = GoogleFontsRequest>) -> Self {
        requests
            .into_iter()
            .fold(GoogleFontsRequest::default(), GoogleFontsRequest::merge)
    }
}

fn extend_unique<T: PartialEq>(into: &mut Vec<T>, from: Vec<T>) {
    for item in from {
        if !into.contains(&item) {
            into.push(item);
        }
    }
}
