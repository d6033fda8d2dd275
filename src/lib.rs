//! Acode — prompt-pack composition engine for an AI coding agent.
//!
//! Assembles the final instruction prompt from a versioned, content-addressed
//! "prompt pack": a directory of markdown fragments described by a
//! `manifest.yml`. The pipeline filters components by composition context,
//! splices `# OVERRIDE:` sections into the system component, de-duplicates
//! headings, and substitutes `{{variable}}` placeholders.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod logging;

pub mod pack;
