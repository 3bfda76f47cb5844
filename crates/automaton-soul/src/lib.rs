//! Automaton Soul — identity document store with phase-locked strata
//!
//! The soul is an append-then-freeze document: each developmental phase
//! owns one stratum of `###` subsections, writable only while the agent is
//! in that phase. When a phase ends the stratum is sealed — the document
//! gets a `<!-- LOCKED -->` marker, the database gets a snapshot row, and
//! every later write attempt is journaled instead of applied.

pub mod alignment;
pub mod document;
pub mod lock;
pub mod sections;
pub mod update;
pub mod validate;

pub use alignment::{genesis_alignment, identity_block, IdentityWeights};
pub use document::{InheritedTraits, PhaseSection, SoulDocument};
pub use update::{SoulStore, SoulUpdateResult, StagedWrite};
