// RedRun - app/mod.rs
//
// Application layer: rule catalog assembly and batch orchestration.
// Dependencies: core, platform.
// Must NOT depend on: ui.

pub mod batch;
pub mod rule_mgr;
