//! Trait population aggregation against the baseline dataset.

use std::collections::{BTreeMap, BTreeSet};

use crate::{
    properties::{BaselineRow, TokenId, TraitStat, TRAITS},
    reconcile::WizardTraitIndex,
};

#[derive(Debug, Default, Clone, Copy)]
struct Counts {
    old: u64,
    new: u64,
}

/// Computes one [`TraitStat`] per `(trait, value)` observed in `baseline`.
///
/// `old` counts every baseline row with the value, `new` only rows whose token is not in
/// `burned`, so `new <= old` always holds. Rows are sorted by value name; the sort is stable,
/// so equal names keep trait vocabulary order.
pub fn aggregate(
    baseline: &[BaselineRow],
    burned: &BTreeSet<TokenId>,
    wizard_traits: &WizardTraitIndex,
) -> Vec<TraitStat> {
    let mut counts: BTreeMap<&'static str, BTreeMap<&str, Counts>> = BTreeMap::new();

    for row in baseline {
        let is_burned = burned.contains(&row.token_id);
        for name in TRAITS {
            let Some(value) = row.traits.get(name).map(String::as_str) else {
                continue;
            };
            if value.is_empty() {
                continue;
            }
            let entry = counts.entry(name).or_default().entry(value).or_default();
            entry.old += 1;
            if !is_burned {
                entry.new += 1;
            }
        }
    }

    let mut output = Vec::new();
    for name in TRAITS {
        let Some(values) = counts.get(name) else {
            continue;
        };
        for (value, c) in values {
            let wizards = wizard_traits
                .get(&(name.to_string(), value.to_string()))
                .cloned()
                .unwrap_or_default();
            output.push(TraitStat {
                trait_type: name.to_string(),
                name: value.to_string(),
                old: c.old,
                new: c.new,
                diff: c.old - c.new,
                wizards,
            });
        }
    }
    output.sort_by(|a, b| a.name.cmp(&b.name));
    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_log::test;

    fn id(s: &str) -> TokenId {
        TokenId::parse(s).unwrap()
    }

    fn baseline() -> Vec<BaselineRow> {
        vec![
            BaselineRow::new(id("1")).with_trait("head", "Wizard Hat").with_trait("rune", "Sun"),
            BaselineRow::new(id("2")).with_trait("head", "Wizard Hat").with_trait("rune", "Moon"),
            BaselineRow::new(id("3")).with_trait("head", "Wizard Hat").with_trait("rune", ""),
        ]
    }

    #[test]
    fn test_single_burn_scenario() {
        let burned: BTreeSet<TokenId> = [id("2")].into();
        let mut index = WizardTraitIndex::new();
        index.insert(("head".to_string(), "Wizard Hat".to_string()), vec![id("2")]);

        let stats = aggregate(&baseline(), &burned, &index);
        let hat = stats
            .iter()
            .find(|s| s.trait_type == "head" && s.name == "Wizard Hat")
            .unwrap();
        assert_eq!((hat.old, hat.new, hat.diff), (3, 2, 1));
        assert_eq!(hat.wizards, vec![id("2")]);

        let moon = stats.iter().find(|s| s.name == "Moon").unwrap();
        assert_eq!((moon.old, moon.new, moon.diff), (1, 0, 1));
        assert!(moon.wizards.is_empty());
    }

    #[test]
    fn test_counts_reconcile() {
        let burned: BTreeSet<TokenId> = [id("1"), id("3"), id("999")].into();
        let stats = aggregate(&baseline(), &burned, &WizardTraitIndex::new());
        for stat in &stats {
            assert!(stat.new <= stat.old, "{stat:?}");
            assert_eq!(stat.diff, stat.old - stat.new);
        }
        let total_old: u64 = stats.iter().filter(|s| s.trait_type == "head").map(|s| s.old).sum();
        assert_eq!(total_old, 3);
    }

    #[test]
    fn test_empty_values_are_not_counted() {
        let stats = aggregate(&baseline(), &BTreeSet::new(), &WizardTraitIndex::new());
        assert!(stats.iter().all(|s| !s.name.is_empty()));
        assert_eq!(stats.len(), 3);
    }

    #[test]
    fn test_sorted_by_value_name_then_vocabulary() {
        let rows = vec![
            BaselineRow::new(id("1")).with_trait("rune", "Alpha").with_trait("head", "Zed"),
            BaselineRow::new(id("2")).with_trait("background", "Alpha").with_trait("head", "Alpha"),
        ];
        let stats = aggregate(&rows, &BTreeSet::new(), &WizardTraitIndex::new());
        let order: Vec<(&str, &str)> = stats
            .iter()
            .map(|s| (s.name.as_str(), s.trait_type.as_str()))
            .collect();
        assert_eq!(
            order,
            vec![("Alpha", "head"), ("Alpha", "rune"), ("Alpha", "background"), ("Zed", "head")]
        );
    }
}
