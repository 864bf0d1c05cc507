// RedRun - platform/mod.rs
//
// Platform abstraction layer: config directories and reading input text.
// Dependencies: standard library, directories, memmap2.
// Must NOT depend on: core, app, ui.

pub mod config;
pub mod fs;
