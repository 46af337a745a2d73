//! Core value types shared by every stage of the ingestion pipeline.
//!
//! - [`TokenId`]: canonical decimal token identifier
//! - [`AttributeEntry`]: one `(key, value)` attribute pulled out of a metadata record
//! - [`Soul`]: a processed soul token with its inherited traits and burn order
//! - [`BaselineRow`]: one original (pre-burn) wizard from the static dataset
//! - [`TraitStat`] / [`Snapshot`]: the published result of one refresh cycle

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::{
    cmp::Ordering,
    collections::BTreeMap,
    fmt::{self, Display, Formatter},
    str::FromStr,
};

use crate::error::SoulburnError;

/// Trait names recognized on wizards and souls, in publication order.
pub const TRAITS: [&str; 6] = ["head", "body", "prop", "familiar", "rune", "background"];

/// Returns the canonical vocabulary name for `key`, matched case-insensitively.
pub fn trait_name(key: &str) -> Option<&'static str> {
    let key = key.trim();
    TRAITS
        .iter()
        .copied()
        .find(|name| name.eq_ignore_ascii_case(key))
}

/// True when `key` is the soul burn-order marker ("Burn order", "burnorder", "BURN  ORDER").
pub fn is_burn_order_key(key: &str) -> bool {
    let squashed: String = key
        .chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect();
    squashed == "burnorder"
}

const DECIMAL_LIMB: u64 = 1_000_000_000;

/// Canonical decimal-string token identifier.
///
/// Hex (`0x...`) and decimal spellings of the same integer collapse to the same value, so
/// `"0x0a"`, `"10"`, `"010"` and the JSON number `10` are all `TokenId("10")`. Ordering is
/// numeric.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TokenId(String);

impl TokenId {
    /// Normalizes a raw JSON identifier: strings (hex or decimal) and non-negative numbers.
    pub fn from_json(raw: &Value) -> Option<TokenId> {
        match raw {
            Value::String(s) => TokenId::parse(s),
            Value::Number(n) => {
                if let Some(u) = n.as_u64() {
                    Some(TokenId(u.to_string()))
                } else if n.as_i64().is_some() {
                    None
                } else {
                    let f = n.as_f64()?;
                    if f.is_finite() && f >= 0.0 {
                        // `+ 0.0` folds a negative zero into zero
                        Some(TokenId(format!("{:.0}", f.trunc() + 0.0)))
                    } else {
                        None
                    }
                }
            }
            _ => None,
        }
    }

    /// Normalizes a textual identifier, returning `None` for anything that is not a
    /// non-negative integer in hex or decimal.
    pub fn parse(raw: &str) -> Option<TokenId> {
        let raw = raw.trim();
        if let Some(hex) = raw.strip_prefix("0x").or_else(|| raw.strip_prefix("0X")) {
            return hex_to_decimal(hex).map(TokenId);
        }
        if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        let trimmed = raw.trim_start_matches('0');
        if trimmed.is_empty() {
            Some(TokenId("0".to_string()))
        } else {
            Some(TokenId(trimmed.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Exact conversion of an arbitrary-length hex digit string to decimal text.
fn hex_to_decimal(hex: &str) -> Option<String> {
    if hex.is_empty() {
        return None;
    }
    // little-endian base 1e9 limbs
    let mut limbs: Vec<u64> = vec![0];
    for c in hex.chars() {
        let mut carry = u64::from(c.to_digit(16)?);
        for limb in limbs.iter_mut() {
            let v = *limb * 16 + carry;
            *limb = v % DECIMAL_LIMB;
            carry = v / DECIMAL_LIMB;
        }
        if carry > 0 {
            limbs.push(carry);
        }
    }
    let (most_significant, rest) = limbs.split_last()?;
    let mut out = most_significant.to_string();
    for limb in rest.iter().rev() {
        out.push_str(&format!("{limb:09}"));
    }
    Some(out)
}

impl Ord for TokenId {
    fn cmp(&self, other: &Self) -> Ordering {
        // canonical form has no leading zeros, so length orders magnitude
        self.0
            .len()
            .cmp(&other.0.len())
            .then_with(|| self.0.cmp(&other.0))
    }
}

impl PartialOrd for TokenId {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Display for TokenId {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for TokenId {
    type Err = SoulburnError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TokenId::parse(s)
            .ok_or_else(|| SoulburnError::Serialization(format!("Invalid token id '{s}'")))
    }
}

impl TryFrom<String> for TokenId {
    type Error = SoulburnError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<TokenId> for String {
    fn from(id: TokenId) -> String {
        id.0
    }
}

/// One attribute of a metadata record. The value keeps its JSON type so burn orders can be
/// read from either numbers or strings.
#[derive(Debug, Clone, PartialEq)]
pub struct AttributeEntry {
    pub key: String,
    pub value: Value,
}

impl AttributeEntry {
    pub fn new<K: Into<String>>(key: K, value: Value) -> Self {
        AttributeEntry {
            key: key.into(),
            value,
        }
    }

    /// The value rendered as published text: strings verbatim, null as empty, anything else
    /// as compact JSON.
    pub fn value_text(&self) -> String {
        match &self.value {
            Value::String(s) => s.clone(),
            Value::Null => String::new(),
            other => other.to_string(),
        }
    }

    /// Integer reading of the value for burn-order attributes.
    pub fn value_as_order(&self) -> Option<i64> {
        match &self.value {
            Value::Number(n) => n.as_i64().or_else(|| {
                n.as_f64()
                    .filter(|f| f.is_finite() && f.fract() == 0.0)
                    .filter(|f| *f >= i64::MIN as f64 && *f <= i64::MAX as f64)
                    .map(|f| f as i64)
            }),
            Value::String(s) => s.trim().parse::<i64>().ok(),
            _ => None,
        }
    }
}

/// A processed soul token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Soul {
    pub id: TokenId,
    pub name: String,
    pub traits: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub burn_order: Option<i64>,
}

impl Soul {
    pub fn new(id: TokenId, name: String) -> Self {
        Soul {
            id,
            name,
            traits: BTreeMap::new(),
            burn_order: None,
        }
    }
}

/// One original wizard from the baseline dataset: trait name -> value for each recognized
/// trait present in the source row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BaselineRow {
    pub token_id: TokenId,
    pub traits: BTreeMap<String, String>,
}

impl BaselineRow {
    pub fn new(token_id: TokenId) -> Self {
        BaselineRow {
            token_id,
            traits: BTreeMap::new(),
        }
    }

    pub fn with_trait(mut self, name: &str, value: &str) -> Self {
        self.traits.insert(name.to_string(), value.to_string());
        self
    }
}

/// Before/after population of one trait value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraitStat {
    #[serde(rename = "type")]
    pub trait_type: String,
    pub name: String,
    pub old: u64,
    pub new: u64,
    pub diff: u64,
    pub wizards: Vec<TokenId>,
}

/// The complete published result of one refresh cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub traits: Vec<TraitStat>,
    pub burned: u64,
    pub flames: i64,
    pub order: Vec<TokenId>,
    pub souls: BTreeMap<TokenId, Soul>,
}

impl Snapshot {
    /// The snapshot served before any cycle has succeeded.
    pub fn empty(flames_total: i64) -> Self {
        Snapshot {
            flames: flames_total,
            ..Default::default()
        }
    }
}
