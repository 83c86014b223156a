// src/portfolio/rules.rs

//! Keyword-driven demand-linkage adjustments applied after greedy allocation.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::model::item::ItemId;
use crate::portfolio::normalize::NormalizedItem;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleKind {
    /// Goods bought together; boosted when every keyword is present.
    Complement,
    /// Goods that cannibalize each other; cut when every keyword is present.
    Substitute,
    /// Goods tied to a season; boosted while that season is active.
    Seasonal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrelationRule {
    pub kind: RuleKind,
    /// Lowercase substrings matched against item name and SKU.
    pub keywords: Vec<String>,
    pub factor: f64,
    /// Season that must be active for a seasonal rule to fire.
    pub condition: Option<String>,
}

impl CorrelationRule {
    fn new(kind: RuleKind, keywords: &[&str], factor: f64, condition: Option<&str>) -> Self {
        Self {
            kind,
            keywords: keywords.iter().map(|k| k.to_lowercase()).collect(),
            factor,
            condition: condition.map(str::to_lowercase),
        }
    }

    pub fn complement(keywords: &[&str], factor: f64) -> Self {
        Self::new(RuleKind::Complement, keywords, factor, None)
    }

    pub fn substitute(keywords: &[&str], factor: f64) -> Self {
        Self::new(RuleKind::Substitute, keywords, factor, None)
    }

    pub fn seasonal(keywords: &[&str], factor: f64, season: &str) -> Self {
        Self::new(RuleKind::Seasonal, keywords, factor, Some(season))
    }

    fn fires(&self, allocated: &[&NormalizedItem], active_season: Option<&str>) -> bool {
        match self.kind {
            RuleKind::Complement | RuleKind::Substitute => self
                .keywords
                .iter()
                .all(|k| allocated.iter().any(|item| item.matches_keyword(k))),
            RuleKind::Seasonal => match (&self.condition, active_season) {
                (None, _) => true,
                (Some(cond), Some(season)) => cond.eq_ignore_ascii_case(season),
                (Some(_), None) => false,
            },
        }
    }
}

/// Phone/case and printer/ink complements, one brand-substitute pair, and
/// summer/winter seasonal boosts.
pub fn default_rules() -> Vec<CorrelationRule> {
    vec![
        CorrelationRule::complement(&["phone", "case"], 1.2),
        CorrelationRule::complement(&["printer", "ink"], 1.3),
        CorrelationRule::substitute(&["brand_a", "brand_b"], 0.8),
        CorrelationRule::seasonal(&["summer"], 2.0, "summer"),
        CorrelationRule::seasonal(&["winter"], 2.0, "winter"),
    ]
}

/// Scales allocated quantities of items matched by firing rules.
///
/// Firing is decided against the allocation as it was before any rule ran.
/// Quantities are rounded; items rounded down to zero are dropped.
pub fn apply_correlation_rules(
    allocation: &BTreeMap<ItemId, u32>,
    items: &BTreeMap<ItemId, NormalizedItem>,
    rules: &[CorrelationRule],
    active_season: Option<&str>,
) -> BTreeMap<ItemId, u32> {
    let allocated: Vec<&NormalizedItem> = allocation.keys().filter_map(|id| items.get(id)).collect();
    let mut adjusted = allocation.clone();

    for rule in rules.iter().filter(|r| r.fires(&allocated, active_season)) {
        for item in &allocated {
            if !rule.keywords.iter().any(|k| item.matches_keyword(k)) {
                continue;
            }
            if let Some(qty) = adjusted.get_mut(&item.id) {
                let scaled = (f64::from(*qty) * rule.factor).round().max(0.0);
                debug!(item = item.id, kind = ?rule.kind, from = *qty, to = scaled, "correlation rule applied");
                *qty = scaled.min(f64::from(u32::MAX)) as u32;
            }
        }
    }

    adjusted.retain(|_, qty| *qty > 0);
    adjusted
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ValuationParameters;
    use crate::model::item::Item;
    use crate::portfolio::normalize::normalize_item;
    use crate::pricing::VolatilitySynthesizer;

    fn lookup(names: &[(ItemId, &str)]) -> BTreeMap<ItemId, NormalizedItem> {
        let synth = VolatilitySynthesizer::default();
        let params = ValuationParameters::default();
        names
            .iter()
            .map(|(id, name)| {
                let item = Item::new(*id, format!("SKU-{id}"), 5.0, 1.0, 10.0, 5.0).with_name(*name);
                (*id, normalize_item(&item, &params, &synth))
            })
            .collect()
    }

    #[test]
    fn complements_boost_only_when_all_present() {
        let items = lookup(&[(1, "Phone X"), (2, "Phone case"), (3, "Cable")]);
        let both: BTreeMap<ItemId, u32> = [(1, 10), (2, 20), (3, 5)].into_iter().collect();
        let out = apply_correlation_rules(&both, &items, &default_rules(), None);
        assert_eq!(out[&1], 12);
        assert_eq!(out[&2], 24);
        assert_eq!(out[&3], 5);

        let only_cable: BTreeMap<ItemId, u32> = [(1, 10), (3, 5)].into_iter().collect();
        let items = lookup(&[(1, "Charger"), (3, "Cable")]);
        assert_eq!(apply_correlation_rules(&only_cable, &items, &default_rules(), None), only_cable);
    }

    #[test]
    fn substitutes_are_cut() {
        let items = lookup(&[(1, "brand_a soap"), (2, "brand_b soap")]);
        let alloc: BTreeMap<ItemId, u32> = [(1, 10), (2, 10)].into_iter().collect();
        let out = apply_correlation_rules(&alloc, &items, &default_rules(), None);
        assert_eq!(out[&1], 8);
        assert_eq!(out[&2], 8);
    }

    #[test]
    fn seasonal_rules_need_the_active_season() {
        let items = lookup(&[(1, "Summer hat")]);
        let alloc: BTreeMap<ItemId, u32> = [(1, 10)].into_iter().collect();
        assert_eq!(apply_correlation_rules(&alloc, &items, &default_rules(), None)[&1], 10);
        assert_eq!(apply_correlation_rules(&alloc, &items, &default_rules(), Some("winter"))[&1], 10);
        assert_eq!(apply_correlation_rules(&alloc, &items, &default_rules(), Some("Summer"))[&1], 20);
    }

    #[test]
    fn zeroed_items_are_dropped() {
        let items = lookup(&[(1, "brand_a"), (2, "brand_b")]);
        let alloc: BTreeMap<ItemId, u32> = [(1, 4), (2, 30)].into_iter().collect();
        let rules = vec![CorrelationRule::substitute(&["brand_a", "brand_b"], 0.1)];
        let out = apply_correlation_rules(&alloc, &items, &rules, None);
        // 0.4 rounds to 0
        assert!(!out.contains_key(&1));
        assert_eq!(out[&2], 3);
    }
}
