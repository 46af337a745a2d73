//! Burn reconciliation: turns normalized soul records into the burn-order index and soul
//! table, and normalized wizard records into the burned-wizard trait index.

use std::collections::{BTreeMap, BTreeSet};

use crate::{
    normalize::NormalizedRecord,
    properties::{is_burn_order_key, trait_name, Soul, TokenId},
};

/// Burned wizard id -> burn-order index.
pub type BurnOrderIndex = BTreeMap<TokenId, i64>;

/// `(trait name, value)` -> burned wizards carrying that value, in fetch order.
pub type WizardTraitIndex = BTreeMap<(String, String), Vec<TokenId>>;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Reconciliation {
    pub burn_order: BurnOrderIndex,
    pub souls: BTreeMap<TokenId, Soul>,
}

impl Reconciliation {
    /// The ids to look up in the wizard collection: exactly the burn-order keys.
    pub fn burned_ids(&self) -> Vec<TokenId> {
        self.burn_order.keys().cloned().collect()
    }

    pub fn burned_set(&self) -> BTreeSet<TokenId> {
        self.burn_order.keys().cloned().collect()
    }

    /// Burned ids, most recently burned first. Ties fall back to ascending id.
    pub fn order(&self) -> Vec<TokenId> {
        let mut entries: Vec<(&TokenId, &i64)> = self.burn_order.iter().collect();
        entries.sort_by(|(a_id, a), (b_id, b)| b.cmp(a).then_with(|| a_id.cmp(b_id)));
        entries.into_iter().map(|(id, _)| id.clone()).collect()
    }
}

/// Builds the soul table and burn-order index.
///
/// A soul with no parseable burn order stays in the soul table but is not burned. A soul id
/// seen again replaces the earlier record, burn order included.
pub fn reconcile<'a, I>(records: I) -> Reconciliation
where
    I: IntoIterator<Item = &'a NormalizedRecord>,
{
    let mut result = Reconciliation::default();

    for record in records {
        let mut soul = Soul::new(record.id.clone(), record.name.clone());

        for attr in record.attributes.iter() {
            if is_burn_order_key(&attr.key) {
                match attr.value_as_order() {
                    Some(order) => soul.burn_order = Some(order),
                    None => tracing::warn!(
                        "Could not convert burn order value '{}' to int for token {}",
                        attr.value_text(),
                        record.id
                    ),
                }
            } else if let Some(name) = trait_name(&attr.key) {
                soul.traits
                    .insert(name.to_string(), attr.value_text().trim().to_string());
            }
        }

        if result.souls.contains_key(&soul.id) {
            tracing::debug!("Soul {} listed more than once, keeping the latest", soul.id);
        }
        match soul.burn_order {
            Some(order) => {
                result.burn_order.insert(soul.id.clone(), order);
            }
            None => {
                result.burn_order.remove(&soul.id);
            }
        }
        result.souls.insert(soul.id.clone(), soul);
    }

    tracing::info!(
        "Processed {} souls, {} with burn orders",
        result.souls.len(),
        result.burn_order.len()
    );
    result
}

/// Indexes the recognized traits of fetched burned wizards.
pub fn index_wizard_traits<'a, I>(records: I) -> WizardTraitIndex
where
    I: IntoIterator<Item = &'a NormalizedRecord>,
{
    let mut index = WizardTraitIndex::new();
    let mut wizards = 0usize;
    for record in records {
        wizards += 1;
        for attr in record.attributes.iter() {
            if let Some(name) = trait_name(&attr.key) {
                // Baseline cells are trimmed on load; keys must match them
                index
                    .entry((name.to_string(), attr.value_text().trim().to_string()))
                    .or_default()
                    .push(record.id.clone());
            }
        }
    }
    tracing::info!("Indexed traits of {wizards} burned wizards");
    index
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::properties::AttributeEntry;
    use serde_json::{json, Value};
    use test_log::test;

    fn record(id: &str, attrs: &[(&str, Value)]) -> NormalizedRecord {
        NormalizedRecord {
            id: TokenId::parse(id).unwrap(),
            name: format!("Soul {id}"),
            attributes: attrs
                .iter()
                .map(|(k, v)| AttributeEntry::new(*k, v.clone()))
                .collect(),
        }
    }

    #[test]
    fn test_burn_order_and_traits() {
        let souls = vec![
            record("2", &[("Burn order", json!(10)), ("head", json!("Wizard Hat")), ("Serial", json!(2))]),
            record("5", &[("burnorder", json!("11")), ("Rune", json!("Sun"))]),
        ];
        let result = reconcile(&souls);
        assert_eq!(result.burn_order.len(), 2);
        let two = &result.souls[&TokenId::parse("2").unwrap()];
        assert_eq!(two.burn_order, Some(10));
        assert_eq!(two.traits.get("head").map(String::as_str), Some("Wizard Hat"));
        assert!(!two.traits.contains_key("serial"));
        let five = &result.souls[&TokenId::parse("5").unwrap()];
        assert_eq!(five.traits.get("rune").map(String::as_str), Some("Sun"));
    }

    #[test]
    fn test_unparseable_burn_order_keeps_soul() {
        let souls = vec![record("9", &[("Burn order", json!("N/A")), ("body", json!("Robe"))])];
        let result = reconcile(&souls);
        assert!(result.burn_order.is_empty());
        assert!(result.order().is_empty());
        let soul = &result.souls[&TokenId::parse("9").unwrap()];
        assert_eq!(soul.burn_order, None);
        assert_eq!(soul.traits.get("body").map(String::as_str), Some("Robe"));
    }

    #[test]
    fn test_order_descending_with_stable_ties() {
        let souls = vec![
            record("1", &[("Burn order", json!(1))]),
            record("30", &[("Burn order", json!(3))]),
            record("4", &[("Burn order", json!(3))]),
            record("2", &[("Burn order", json!(2))]),
        ];
        let result = reconcile(&souls);
        let order: Vec<String> = result.order().into_iter().map(String::from).collect();
        assert_eq!(order, vec!["4", "30", "2", "1"]);
        assert_eq!(result.burned_set().len(), order.len());
    }

    #[test]
    fn test_duplicate_soul_replaces_burn_entry() {
        let souls = vec![
            record("8", &[("Burn order", json!(5))]),
            record("0x8", &[("head", json!("Hood"))]),
        ];
        let result = reconcile(&souls);
        assert_eq!(result.souls.len(), 1);
        assert!(result.burn_order.is_empty());
    }

    #[test]
    fn test_wizard_trait_index() {
        let wizards = vec![
            record("2", &[("head", json!("Wizard Hat")), ("Body", json!("Robe"))]),
            record("7", &[("Head", json!("Wizard Hat")), ("Serial", json!(7))]),
        ];
        let index = index_wizard_traits(&wizards);
        let hat = &index[&("head".to_string(), "Wizard Hat".to_string())];
        assert_eq!(hat.iter().map(TokenId::as_str).collect::<Vec<_>>(), vec!["2", "7"]);
        assert!(index.contains_key(&("body".to_string(), "Robe".to_string())));
        assert_eq!(index.len(), 2);
    }

    #[test]
    fn test_wizard_trait_values_are_trimmed() {
        let wizards = vec![
            record("2", &[("head", json!(" Wizard Hat "))]),
            record("3", &[("head", json!("Wizard Hat\t"))]),
        ];
        let index = index_wizard_traits(&wizards);
        assert_eq!(index.len(), 1);
        let hat = &index[&("head".to_string(), "Wizard Hat".to_string())];
        assert_eq!(hat.iter().map(TokenId::as_str).collect::<Vec<_>>(), vec!["2", "3"]);
    }
}
