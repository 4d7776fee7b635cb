//! Library crate root: configuration, composition, CLI and runtime modules.

#[path = "lib/mod.rs"]
pub mod lib_mod;
pub use lib_mod as lib;
pub mod cli;
pub mod compose;
pub mod mcp_config;
pub mod server;
