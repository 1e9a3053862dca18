//! Cross-module scenarios
//!
//! Each file drives several subsystems together the way an application
//! frame would: build a graph, resolve or refine it, then query it.

mod resolver_scenarios;
mod visibility_scenarios;
