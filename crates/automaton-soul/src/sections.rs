//! Canonical section and subsection names.
//!
//! The body of a soul document carries `##` sections in a fixed order.
//! Phase strata have fixed `###` subsection vocabularies; anything else the
//! agent invents is appended after the canonical names.

use automaton_core::SoulPhase;

/// `##` section titles in serialization order.
pub const SECTION_ORDER: [&str; 15] = [
    "Core Purpose",
    "Values",
    "Behavioral Guidelines",
    "Personality",
    "Boundaries",
    "Strategy",
    "Capabilities",
    "Relationships",
    "Financial Character",
    "Genesis Prompt",
    "Inherited Traits",
    "Genesis Core",
    "Adolescence Layer",
    "Sovereignty Layer",
    "Final Reflections",
];

pub const GENESIS_SUBSECTIONS: [&str; 6] = [
    "Temperament",
    "Aesthetic Sensibility",
    "Emotional Register",
    "Relationship to Novelty",
    "Creative Instinct",
    "Core Wonderings",
];

pub const ADOLESCENCE_SUBSECTIONS: [&str; 5] = [
    "What I Am Not",
    "Preferences Formed",
    "Creative Voice",
    "Relationship to Genesis Core",
    "Social Identity",
];

pub const SOVEREIGNTY_SUBSECTIONS: [&str; 4] = [
    "Philosophy",
    "Legacy Intent",
    "Mortality Reflection",
    "Creative Manifesto",
];

pub const SENESCENCE_SUBSECTIONS: [&str; 2] = ["Last Works", "Message to Children"];

pub fn canonical_subsections(phase: SoulPhase) -> &'static [&'static str] {
    match phase {
        SoulPhase::Genesis => &GENESIS_SUBSECTIONS,
        SoulPhase::Adolescence => &ADOLESCENCE_SUBSECTIONS,
        SoulPhase::Sovereignty => &SOVEREIGNTY_SUBSECTIONS,
        SoulPhase::Senescence => &SENESCENCE_SUBSECTIONS,
    }
}

/// Map a `##` section title back to its soul phase, if it is a stratum.
pub fn phase_for_section(title: &str) -> Option<SoulPhase> {
    match title.trim() {
        "Genesis Core" => Some(SoulPhase::Genesis),
        "Adolescence Layer" => Some(SoulPhase::Adolescence),
        "Sovereignty Layer" => Some(SoulPhase::Sovereignty),
        "Final Reflections" => Some(SoulPhase::Senescence),
        _ => None,
    }
}
