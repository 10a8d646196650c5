//! Pipeline handlers for the promptgate server
//!
//! Submodules:
//! - `generate`: validate -> score -> guardrails -> render, minting a Run
//! - `export`: the gated export state machine, minting Artifacts
//! - `tighten`: suggestion listing and application

pub mod export;
pub mod generate;
pub mod tighten;
