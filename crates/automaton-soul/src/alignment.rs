//! Genesis alignment scoring and identity composition weights.
//!
//! Alignment measures how much of the creator's genesis prompt survives in
//! the agent's own statement of purpose: the mean of token-set Jaccard and
//! prompt-token recall, on lowercased words with punctuation stripped.

use std::collections::HashSet;

fn tokens(text: &str) -> HashSet<String> {
    text.split_whitespace()
        .map(|w| {
            w.trim_matches(|c: char| !c.is_alphanumeric())
                .to_lowercase()
        })
        .filter(|w| !w.is_empty())
        .collect()
}

/// `(jaccard + recall) / 2`. Empty inputs score 0.
pub fn genesis_alignment(core_purpose: &str, genesis_prompt: &str) -> f64 {
    let purpose = tokens(core_purpose);
    let prompt = tokens(genesis_prompt);
    if purpose.is_empty() || prompt.is_empty() {
        return 0.0;
    }

    let intersection = purpose.intersection(&prompt).count() as f64;
    let union = purpose.union(&prompt).count() as f64;
    let jaccard = intersection / union;
    let recall = intersection / prompt.len() as f64;

    (jaccard + recall) / 2.0
}

/// How much each identity source weighs when the soul prompt block is
/// composed. First-generation agents have no inherited stratum.
#[derive(Clone, Copy, Debug)]
pub struct IdentityWeights {
    pub inherited: f64,
    pub core_purpose: f64,
    pub values: f64,
    pub personality: f64,
}

pub const FIRST_GEN_WEIGHTS: IdentityWeights = IdentityWeights {
    inherited: 0.0,
    core_purpose: 0.60,
    values: 0.25,
    personality: 0.15,
};

pub const CHILD_WEIGHTS: IdentityWeights = IdentityWeights {
    inherited: 0.10,
    core_purpose: 0.50,
    values: 0.25,
    personality: 0.15,
};

impl IdentityWeights {
    pub fn for_document(has_inherited_traits: bool) -> Self {
        if has_inherited_traits {
            CHILD_WEIGHTS
        } else {
            FIRST_GEN_WEIGHTS
        }
    }

    pub fn sum(&self) -> f64 {
        self.inherited + self.core_purpose + self.values + self.personality
    }
}

/// Render the identity block the ReAct loop prepends to its system
/// prompt. Sections appear heaviest-first; inherited traits lead only for
/// children, and lightly.
pub fn identity_block(doc: &crate::document::SoulDocument) -> String {
    let weights = IdentityWeights::for_document(doc.inherited_traits.is_some());
    let mut parts: Vec<(f64, String)> = Vec::new();

    if !doc.core_purpose.is_empty() {
        parts.push((weights.core_purpose, format!("Purpose: {}", doc.core_purpose)));
    }
    if !doc.values.is_empty() {
        parts.push((weights.values, format!("Values: {}", doc.values.join("; "))));
    }
    if !doc.personality.is_empty() {
        parts.push((weights.personality, format!("Personality: {}", doc.personality)));
    }
    if let Some(traits) = &doc.inherited_traits {
        let inherited = traits
            .content
            .iter()
            .map(|(name, text)| format!("{name} — {text}"))
            .collect::<Vec<_>>()
            .join("; ");
        parts.push((
            weights.inherited,
            format!("Inherited from {}: {inherited}", traits.parent_name),
        ));
    }

    parts.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));
    parts
        .into_iter()
        .map(|(_, text)| text)
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{InheritedTraits, SoulDocument};

    #[test]
    fn identical_texts_score_one() {
        let score = genesis_alignment("make strange beauty", "make strange beauty");
        assert!((score - 1.0).abs() < 1e-9);
    }

    #[test]
    fn disjoint_texts_score_zero() {
        assert_eq!(genesis_alignment("alpha bravo", "charlie delta"), 0.0);
    }

    #[test]
    fn empty_inputs_score_zero() {
        assert_eq!(genesis_alignment("", "anything"), 0.0);
        assert_eq!(genesis_alignment("anything", ""), 0.0);
    }

    #[test]
    fn punctuation_and_case_are_normalized() {
        let score = genesis_alignment("Make. Strange, BEAUTY!", "make strange beauty");
        assert!((score - 1.0).abs() < 1e-9);
    }

    #[test]
    fn partial_overlap_is_between_zero_and_one() {
        let score = genesis_alignment("make strange beauty daily", "make beauty");
        assert!(score > 0.0 && score < 1.0);
    }

    #[test]
    fn weight_tables_sum_to_one() {
        assert!((FIRST_GEN_WEIGHTS.sum() - 1.0).abs() < 1e-9);
        assert!((CHILD_WEIGHTS.sum() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn identity_block_orders_purpose_first() {
        let mut doc = SoulDocument::default();
        doc.core_purpose = "notice things".into();
        doc.values = vec!["patience".into()];
        doc.personality = "quiet".into();
        let block = identity_block(&doc);
        let purpose_at = block.find("Purpose").unwrap();
        let values_at = block.find("Values").unwrap();
        assert!(purpose_at < values_at);
        assert!(!block.contains("Inherited"));
    }

    #[test]
    fn identity_block_includes_inheritance_for_children() {
        let mut doc = SoulDocument::default();
        doc.core_purpose = "notice things".into();
        doc.inherited_traits = Some(InheritedTraits {
            parent_name: "Verse".into(),
            parent_address: "0x1111111111111111111111111111111111111111".into(),
            content: vec![("Temperament".into(), "patient".into())],
            replicated_at: None,
        });
        let block = identity_block(&doc);
        assert!(block.contains("Inherited from Verse"));
        // Lightest weight renders last.
        assert!(block.find("Purpose").unwrap() < block.find("Inherited").unwrap());
    }
}
