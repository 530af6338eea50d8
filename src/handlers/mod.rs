// src/handlers/mod.rs

pub mod diagnostic;
pub mod leaderboard;
pub mod stats;
