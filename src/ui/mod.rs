// RedRun - ui/mod.rs
//
// Presentation layer: plain-text terminal rendering.

pub mod console;
