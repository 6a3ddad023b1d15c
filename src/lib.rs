//! BioPortal ontology tools: term and property search, text annotation and
//! usage analytics, reshaped into small stable result rows.

pub mod cli;
pub mod config;
pub mod diagnostics;
pub mod entities;
pub mod error;
pub mod render;
pub mod sources;
pub mod transform;

pub use error::BioPortalError;
