//! Host stand-in for driving `factions-core` from the command line.
//!
//! A run loads a config, an optional checkpoint and a JSONL script of
//! timed player requests, then steps the world one tick at a time.

pub mod loader;
pub mod script;
pub mod session;
