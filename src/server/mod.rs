//! Runtime settings, launch guards and the serving loop.
pub mod config;
pub mod guard;
pub mod runtime;
