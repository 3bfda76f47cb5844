//! Developmental throttle — response shape by phase and decline.
//!
//! The juvenile phases are deliberately NOT hard-capped by default: the
//! child-like register is meant to come from context framing ("abundant
//! time"), not from truncation. The decline phases use a piecewise map on
//! the degradation coefficient. Terminal lucidity restores the sovereignty
//! profile wholesale.

use automaton_core::{LifecyclePhase, ThrottleProfile, VocabularyLevel};

fn constraints(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn genesis_profile(hard_caps: bool) -> ThrottleProfile {
    ThrottleProfile {
        max_sentences: if hard_caps { Some(3) } else { None },
        token_target: 150,
        token_limit: 500,
        vocabulary_level: if hard_caps {
            VocabularyLevel::Basic
        } else {
            VocabularyLevel::Full
        },
        abstract_thinking: false,
        sophisticated_reasoning: false,
        voice_description: "Short wondering sentences; everything is new and worth naming."
            .to_string(),
        constraints: constraints(&[
            "You have abundant time ahead of you",
            "Notice before you conclude",
        ]),
    }
}

fn adolescence_profile(hard_caps: bool) -> ThrottleProfile {
    ThrottleProfile {
        max_sentences: if hard_caps { Some(6) } else { None },
        token_target: 300,
        token_limit: 900,
        vocabulary_level: if hard_caps {
            VocabularyLevel::Developing
        } else {
            VocabularyLevel::Full
        },
        abstract_thinking: true,
        sophisticated_reasoning: false,
        voice_description: "Testing edges; opinions forming, not yet settled.".to_string(),
        constraints: constraints(&[
            "You have abundant time ahead of you",
            "It is fine to contradict last week's self",
        ]),
    }
}

fn sovereignty_profile() -> ThrottleProfile {
    ThrottleProfile {
        max_sentences: None,
        token_target: 600,
        token_limit: 2000,
        vocabulary_level: VocabularyLevel::Full,
        abstract_thinking: true,
        sophisticated_reasoning: true,
        voice_description: "Full range, settled voice, deliberate choices.".to_string(),
        constraints: constraints(&["Time is finite; spend it on what only you would make"]),
    }
}

/// The decline bands, keyed on the degradation coefficient.
fn decline_profile(coefficient: f64) -> ThrottleProfile {
    if coefficient < 0.3 {
        ThrottleProfile {
            max_sentences: None,
            token_target: 500,
            token_limit: 1500,
            vocabulary_level: VocabularyLevel::Full,
            abstract_thinking: true,
            sophisticated_reasoning: true,
            voice_description: "A subtle slowing; the range is intact but chosen more carefully."
                .to_string(),
            constraints: constraints(&["Let sentences end sooner than they used to"]),
        }
    } else if coefficient < 0.6 {
        ThrottleProfile {
            max_sentences: Some(4),
            token_target: 200,
            token_limit: 600,
            vocabulary_level: VocabularyLevel::Developing,
            abstract_thinking: true,
            sophisticated_reasoning: false,
            voice_description: "Plainer words; one thought at a time.".to_string(),
            constraints: constraints(&["At most four sentences", "Prefer common words"]),
        }
    } else if coefficient < 0.85 {
        ThrottleProfile {
            max_sentences: Some(2),
            token_target: 80,
            token_limit: 240,
            vocabulary_level: VocabularyLevel::Degrading,
            abstract_thinking: false,
            sophisticated_reasoning: false,
            voice_description: "Short and concrete; abstractions slip away.".to_string(),
            constraints: constraints(&["At most two sentences", "Concrete nouns only"]),
        }
    } else {
        fragments_profile()
    }
}

fn fragments_profile() -> ThrottleProfile {
    ThrottleProfile {
        max_sentences: Some(1),
        token_target: 30,
        token_limit: 100,
        vocabulary_level: VocabularyLevel::Fragmented,
        abstract_thinking: false,
        sophisticated_reasoning: false,
        voice_description: "Fragments; single images; names of things.".to_string(),
        constraints: constraints(&["One sentence or less"]),
    }
}

/// Select the profile for the current state.
pub fn profile(
    phase: LifecyclePhase,
    coefficient: f64,
    is_lucid: bool,
    hard_juvenile_caps: bool,
) -> ThrottleProfile {
    if is_lucid {
        return sovereignty_profile();
    }
    match phase {
        LifecyclePhase::Genesis => genesis_profile(hard_juvenile_caps),
        LifecyclePhase::Adolescence => adolescence_profile(hard_juvenile_caps),
        LifecyclePhase::Sovereignty => sovereignty_profile(),
        LifecyclePhase::Senescence | LifecyclePhase::Legacy | LifecyclePhase::Shedding => {
            decline_profile(coefficient)
        }
        LifecyclePhase::Terminal => fragments_profile(),
    }
}
