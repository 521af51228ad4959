//! Playback loop: the single-consumer command dispatcher and session
//! supervisor.
//!
//! **Module structure:**
//! - `core.rs`: `Player` public API, loop lifecycle, session start, shutdown
//! - `commands.rs`: command variants and their handlers

mod commands;
mod core;

pub use commands::PlayerCommand;
pub use core::Player;
