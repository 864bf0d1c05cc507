// RedRun - core/mod.rs
//
// Core business logic layer: the extraction and classification pipeline,
// input expansion, and export.
// Must NOT depend on: ui, platform, app.

pub mod aggregate;
pub mod analyzer;
pub mod detector;
pub mod discovery;
pub mod engine;
pub mod export;
pub mod grouper;
pub mod model;
pub mod normalizer;
pub mod rules;
