// src/services/mod.rs

//! The engine behind the HTTP handlers. Every function receives the store and
//! clock it needs explicitly; nothing here holds state between calls.

pub mod attempt;
pub mod daily_set;
pub mod diagnostic;
pub mod leaderboard;
pub mod stats;
pub mod streak;
