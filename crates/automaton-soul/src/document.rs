//! Soul document model, parser, and writer.
//!
//! The on-disk format is plain text: a key/value header block, then a
//! markdown body of `##` sections. Phase strata carry `###` subsections and
//! HTML-comment lock metadata:
//!
//! ```text
//! format: soul/v1
//! version: 3
//! updated_at: 2026-03-01T00:00:00Z
//! name: Verse
//! current_phase: adolescence
//! phase_transitions: {"adolescence":"2026-02-14T09:00:00Z"}
//!
//! # Verse
//!
//! ## Core Purpose
//!
//! To notice what others walk past.
//!
//! ## Genesis Core
//!
//! <!-- WRITABLE during: Genesis -->
//! <!-- LOCKED -->
//! <!-- Lock date: 2026-02-14T09:00:00Z -->
//!
//! ### Temperament
//!
//! Curious, unhurried.
//! ```
//!
//! The parser accepts both headered v1 documents and legacy unstructured
//! documents (no header, arbitrary sections). Unknown sections survive a
//! round trip via `raw_content`.

use crate::sections;
use automaton_core::{Error, LifecyclePhase, Result, SoulPhase};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::path::Path;

pub const FORMAT_TAG: &str = "soul/v1";

/// One phase stratum: ordered named subsections plus lock metadata.
#[derive(Clone, Debug, PartialEq)]
pub struct PhaseSection {
    pub phase: SoulPhase,
    pub subsections: Vec<(String, String)>,
    pub locked_at: Option<String>,
}

impl PhaseSection {
    pub fn new(phase: SoulPhase) -> Self {
        Self {
            phase,
            subsections: Vec::new(),
            locked_at: None,
        }
    }

    pub fn subsection(&self, name: &str) -> Option<&str> {
        self.subsections
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, text)| text.as_str())
    }

    /// Upsert by name: existing keys keep their position, new keys append.
    pub fn merge(&mut self, updates: &[(String, String)]) {
        for (name, text) in updates {
            match self.subsections.iter_mut().find(|(n, _)| n == name) {
                Some(entry) => entry.1 = text.clone(),
                None => self.subsections.push((name.clone(), text.clone())),
            }
        }
    }
}

/// Traits copied from a parent at replication. Immutable from birth.
#[derive(Clone, Debug, PartialEq)]
pub struct InheritedTraits {
    pub parent_name: String,
    pub parent_address: String,
    pub content: Vec<(String, String)>,
    pub replicated_at: Option<String>,
}

/// In-memory model of the identity document.
#[derive(Clone, Debug, PartialEq)]
pub struct SoulDocument {
    pub version: i64,
    pub updated_at: Option<String>,
    pub name: String,
    pub address: String,
    pub creator: String,
    pub born_at: Option<String>,
    pub constitution_hash: Option<String>,
    pub genesis_alignment: Option<f64>,
    pub last_reflected: Option<String>,
    pub current_phase: LifecyclePhase,
    pub phase_transitions: BTreeMap<String, String>,

    pub core_purpose: String,
    pub values: Vec<String>,
    pub behavioral_guidelines: Vec<String>,
    pub personality: String,
    pub boundaries: Vec<String>,
    pub strategy: String,
    pub capabilities: String,
    pub relationships: String,
    pub financial_character: String,
    pub genesis_prompt: String,

    pub inherited_traits: Option<InheritedTraits>,
    pub genesis_core: Option<PhaseSection>,
    pub adolescence_layer: Option<PhaseSection>,
    pub sovereignty_layer: Option<PhaseSection>,
    pub final_reflections: Option<PhaseSection>,

    /// Unknown `##` sections, preserved in input order.
    pub raw_content: Vec<(String, String)>,
}

impl Default for SoulDocument {
    fn default() -> Self {
        Self {
            version: 1,
            updated_at: None,
            name: String::new(),
            address: String::new(),
            creator: String::new(),
            born_at: None,
            constitution_hash: None,
            genesis_alignment: None,
            last_reflected: None,
            current_phase: LifecyclePhase::Genesis,
            phase_transitions: BTreeMap::new(),
            core_purpose: String::new(),
            values: Vec::new(),
            behavioral_guidelines: Vec::new(),
            personality: String::new(),
            boundaries: Vec::new(),
            strategy: String::new(),
            capabilities: String::new(),
            relationships: String::new(),
            financial_character: String::new(),
            genesis_prompt: String::new(),
            inherited_traits: None,
            genesis_core: None,
            adolescence_layer: None,
            sovereignty_layer: None,
            final_reflections: None,
            raw_content: Vec::new(),
        }
    }
}

impl SoulDocument {
    pub fn phase_section(&self, phase: SoulPhase) -> Option<&PhaseSection> {
        match phase {
            SoulPhase::Genesis => self.genesis_core.as_ref(),
            SoulPhase::Adolescence => self.adolescence_layer.as_ref(),
            SoulPhase::Sovereignty => self.sovereignty_layer.as_ref(),
            SoulPhase::Senescence => self.final_reflections.as_ref(),
        }
    }

    pub fn phase_section_mut(&mut self, phase: SoulPhase) -> &mut Option<PhaseSection> {
        match phase {
            SoulPhase::Genesis => &mut self.genesis_core,
            SoulPhase::Adolescence => &mut self.adolescence_layer,
            SoulPhase::Sovereignty => &mut self.sovereignty_layer,
            SoulPhase::Senescence => &mut self.final_reflections,
        }
    }

    /// Equality modulo the fields the round-trip law excludes.
    pub fn model_eq(&self, other: &SoulDocument) -> bool {
        let mut a = self.clone();
        let mut b = other.clone();
        a.updated_at = None;
        b.updated_at = None;
        a.raw_content.clear();
        b.raw_content.clear();
        a == b
    }
}

/// SHA-256 of a serialized document, hex-encoded.
pub fn content_hash(serialized: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(serialized.as_bytes());
    hex::encode(hasher.finalize())
}

// ============================================================
// Parsing
// ============================================================

/// Parse a soul document. Never fails: legacy or malformed input degrades
/// to a model with null phase sections and `current_phase = genesis`.
pub fn parse(content: &str) -> SoulDocument {
    let mut doc = SoulDocument::default();
    let mut lines = content.lines().peekable();

    // Header block, if present. Peek so a body that starts immediately
    // (no blank separator) keeps its title line.
    if content.trim_start().starts_with("format:") {
        while let Some(line) = lines.peek() {
            let line = line.trim_end();
            if line.is_empty() || line.starts_with('#') {
                break;
            }
            let line = lines.next().unwrap_or_default().trim_end();
            let Some((key, value)) = line.split_once(':') else {
                continue;
            };
            let value = value.trim();
            match key.trim() {
                "format" => {} // tag checked implicitly; tolerate future minors
                "version" => doc.version = value.parse().unwrap_or(1),
                "updated_at" => doc.updated_at = Some(value.to_string()),
                "name" => doc.name = value.to_string(),
                "address" => doc.address = value.to_string(),
                "creator" => doc.creator = value.to_string(),
                "born_at" => doc.born_at = Some(value.to_string()),
                "constitution_hash" => doc.constitution_hash = Some(value.to_string()),
                "genesis_alignment" => doc.genesis_alignment = value.parse().ok(),
                "last_reflected" => doc.last_reflected = Some(value.to_string()),
                "current_phase" => {
                    if let Some(phase) = LifecyclePhase::parse(value) {
                        doc.current_phase = phase;
                    }
                }
                "phase_transitions" => {
                    if let Ok(map) = serde_json::from_str(value) {
                        doc.phase_transitions = map;
                    }
                }
                _ => {} // tolerate unknown header keys
            }
        }
    }

    // Body: `#` title then `##` sections.
    let mut current_section: Option<(String, Vec<String>)> = None;
    let mut finished: Vec<(String, String)> = Vec::new();

    for line in lines {
        if let Some(title) = line.strip_prefix("## ") {
            if let Some((name, body)) = current_section.take() {
                finished.push((name, body.join("\n")));
            }
            current_section = Some((title.trim().to_string(), Vec::new()));
        } else if let Some(name) = line.strip_prefix("# ") {
            if current_section.is_none() && doc.name.is_empty() {
                doc.name = name.trim().to_string();
            } else if let Some((_, body)) = current_section.as_mut() {
                body.push(line.to_string());
            }
        } else if let Some((_, body)) = current_section.as_mut() {
            body.push(line.to_string());
        }
    }
    if let Some((name, body)) = current_section.take() {
        finished.push((name, body.join("\n")));
    }

    for (title, body) in finished {
        apply_section(&mut doc, &title, &body);
    }
    doc
}

fn apply_section(doc: &mut SoulDocument, title: &str, body: &str) {
    match title {
        "Core Purpose" => doc.core_purpose = body.trim().to_string(),
        "Values" => doc.values = parse_bullets(body),
        "Behavioral Guidelines" => doc.behavioral_guidelines = parse_bullets(body),
        "Personality" => doc.personality = body.trim().to_string(),
        "Boundaries" => doc.boundaries = parse_bullets(body),
        "Strategy" => doc.strategy = body.trim().to_string(),
        "Capabilities" => doc.capabilities = body.trim().to_string(),
        "Relationships" => doc.relationships = body.trim().to_string(),
        "Financial Character" => doc.financial_character = body.trim().to_string(),
        "Genesis Prompt" => doc.genesis_prompt = body.trim().to_string(),
        "Inherited Traits" => doc.inherited_traits = Some(parse_inherited(body)),
        _ => {
            if let Some(phase) = sections::phase_for_section(title) {
                *doc.phase_section_mut(phase) = Some(parse_phase_section(phase, body));
            } else {
                doc.raw_content
                    .push((title.to_string(), body.trim().to_string()));
            }
        }
    }
}

fn parse_bullets(body: &str) -> Vec<String> {
    body.lines()
        .filter_map(|line| line.trim().strip_prefix("- "))
        .map(|item| item.trim().to_string())
        .filter(|item| !item.is_empty())
        .collect()
}

fn comment_value<'a>(line: &'a str, key: &str) -> Option<&'a str> {
    line.trim()
        .strip_prefix("<!--")?
        .strip_suffix("-->")
        .map(str::trim)?
        .strip_prefix(key)
        .map(str::trim)
}

fn is_comment_line(line: &str) -> bool {
    let trimmed = line.trim();
    trimmed.starts_with("<!--") && trimmed.ends_with("-->")
}

fn parse_phase_section(phase: SoulPhase, body: &str) -> PhaseSection {
    let mut section = PhaseSection::new(phase);
    for line in body.lines() {
        if let Some(date) = comment_value(line, "Lock date:") {
            section.locked_at = Some(date.to_string());
        }
    }
    // A bare LOCKED marker without a date still means locked.
    if section.locked_at.is_none()
        && body.lines().any(|l| l.trim() == "<!-- LOCKED -->")
    {
        section.locked_at = Some(String::new());
    }
    section.subsections = parse_subsections(body);
    section
}

fn parse_inherited(body: &str) -> InheritedTraits {
    let mut traits = InheritedTraits {
        parent_name: String::new(),
        parent_address: String::new(),
        content: Vec::new(),
        replicated_at: None,
    };
    for line in body.lines() {
        if let Some(value) = comment_value(line, "Parent Address:") {
            traits.parent_address = value.to_string();
        } else if let Some(value) = comment_value(line, "Parent:") {
            traits.parent_name = value.to_string();
        } else if let Some(value) = comment_value(line, "Replicated:") {
            traits.replicated_at = Some(value.to_string());
        }
    }
    traits.content = parse_subsections(body);
    traits
}

/// Split `###` subsections. Comment lines inside bodies are stripped.
fn parse_subsections(body: &str) -> Vec<(String, String)> {
    let mut out: Vec<(String, String)> = Vec::new();
    let mut current: Option<(String, Vec<String>)> = None;

    for line in body.lines() {
        if let Some(name) = line.strip_prefix("### ") {
            if let Some((n, text)) = current.take() {
                out.push((n, text.join("\n").trim().to_string()));
            }
            current = Some((name.trim().to_string(), Vec::new()));
        } else if let Some((_, text)) = current.as_mut() {
            if !is_comment_line(line) {
                text.push(line.to_string());
            }
        }
    }
    if let Some((n, text)) = current.take() {
        out.push((n, text.join("\n").trim().to_string()));
    }
    out
}

// ============================================================
// Writing
// ============================================================

/// Serialize a document into the on-disk v1 format.
pub fn write(doc: &SoulDocument) -> String {
    let mut out = String::new();

    out.push_str(&format!("format: {FORMAT_TAG}\n"));
    out.push_str(&format!("version: {}\n", doc.version));
    if let Some(updated) = &doc.updated_at {
        out.push_str(&format!("updated_at: {updated}\n"));
    }
    if !doc.name.is_empty() {
        out.push_str(&format!("name: {}\n", doc.name));
    }
    if !doc.address.is_empty() {
        out.push_str(&format!("address: {}\n", doc.address));
    }
    if !doc.creator.is_empty() {
        out.push_str(&format!("creator: {}\n", doc.creator));
    }
    if let Some(born) = &doc.born_at {
        out.push_str(&format!("born_at: {born}\n"));
    }
    if let Some(hash) = &doc.constitution_hash {
        out.push_str(&format!("constitution_hash: {hash}\n"));
    }
    if let Some(alignment) = doc.genesis_alignment {
        out.push_str(&format!("genesis_alignment: {alignment:.4}\n"));
    }
    if let Some(reflected) = &doc.last_reflected {
        out.push_str(&format!("last_reflected: {reflected}\n"));
    }
    out.push_str(&format!("current_phase: {}\n", doc.current_phase));
    if !doc.phase_transitions.is_empty() {
        let map = serde_json::to_string(&doc.phase_transitions).unwrap_or_default();
        out.push_str(&format!("phase_transitions: {map}\n"));
    }
    out.push('\n');

    if !doc.name.is_empty() {
        out.push_str(&format!("# {}\n\n", doc.name));
    }

    write_text_section(&mut out, "Core Purpose", &doc.core_purpose);
    write_bullet_section(&mut out, "Values", &doc.values);
    write_bullet_section(&mut out, "Behavioral Guidelines", &doc.behavioral_guidelines);
    write_text_section(&mut out, "Personality", &doc.personality);
    write_bullet_section(&mut out, "Boundaries", &doc.boundaries);
    write_text_section(&mut out, "Strategy", &doc.strategy);
    write_text_section(&mut out, "Capabilities", &doc.capabilities);
    write_text_section(&mut out, "Relationships", &doc.relationships);
    write_text_section(&mut out, "Financial Character", &doc.financial_character);
    write_text_section(&mut out, "Genesis Prompt", &doc.genesis_prompt);

    if let Some(traits) = &doc.inherited_traits {
        out.push_str("## Inherited Traits\n\n");
        out.push_str("<!-- IMMUTABLE -->\n");
        out.push_str(&format!("<!-- Parent: {} -->\n", traits.parent_name));
        out.push_str(&format!(
            "<!-- Parent Address: {} -->\n",
            traits.parent_address
        ));
        if let Some(replicated) = &traits.replicated_at {
            out.push_str(&format!("<!-- Replicated: {replicated} -->\n"));
        }
        out.push('\n');
        write_subsections(&mut out, &traits.content);
    }

    for phase in SoulPhase::ALL {
        if let Some(section) = doc.phase_section(phase) {
            out.push_str(&format!("## {}\n\n", phase.section_title()));
            out.push_str(&format!(
                "<!-- WRITABLE during: {} -->\n",
                phase.writable_label()
            ));
            if let Some(locked_at) = &section.locked_at {
                out.push_str("<!-- LOCKED -->\n");
                if !locked_at.is_empty() {
                    out.push_str(&format!("<!-- Lock date: {locked_at} -->\n"));
                }
            }
            out.push('\n');
            write_subsections(&mut out, &section.subsections);
        }
    }

    for (title, body) in &doc.raw_content {
        write_text_section(&mut out, title, body);
    }

    out
}

fn write_text_section(out: &mut String, title: &str, body: &str) {
    if body.is_empty() {
        return;
    }
    out.push_str(&format!("## {title}\n\n{body}\n\n"));
}

fn write_bullet_section(out: &mut String, title: &str, items: &[String]) {
    if items.is_empty() {
        return;
    }
    out.push_str(&format!("## {title}\n\n"));
    for item in items {
        out.push_str(&format!("- {item}\n"));
    }
    out.push('\n');
}

fn write_subsections(out: &mut String, subsections: &[(String, String)]) {
    for (name, text) in subsections {
        out.push_str(&format!("### {name}\n\n"));
        if !text.is_empty() {
            out.push_str(text.trim_end());
            out.push('\n');
        }
        out.push('\n');
    }
}

// ============================================================
// Disk I/O
// ============================================================

pub fn load(path: &Path) -> Result<SoulDocument> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::SoulParse(format!("read {}: {e}", path.display())))?;
    Ok(parse(&content))
}

/// Stage-and-rename write, same shape as every checkpoint in the runtime.
pub fn write_atomic(path: &Path, serialized: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let tmp = path.with_extension("md.tmp");
    std::fs::write(&tmp, serialized)?;
    std::fs::rename(&tmp, path)?;
    Ok(())
}
