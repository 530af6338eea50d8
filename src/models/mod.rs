// src/models/mod.rs

pub mod answer;
pub mod attempt;
pub mod daily_set;
pub mod diagnostic;
pub mod question;
pub mod stats;
