// src/lib.rs

//! NFL fantasy data pipeline library.
//!
//! Rate-limited extraction of teams, schedules, rosters and boxscores,
//! advisory validation, fantasy scoring and SQLite persistence.

pub mod error;
pub mod models;
pub mod pipeline;
pub mod services;
pub mod storage;
pub mod utils;
