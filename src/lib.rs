// src/lib.rs

pub mod config;
pub mod core;
pub mod custom;
pub mod error;
pub mod filter;
pub mod persistence;

pub use crate::config::EngineConfig;
pub use crate::core::engine::RhymeEngine;
pub use crate::core::query::ToneFilter;
pub use crate::core::types::{PhoneticInfo, QueryResult, Tier};
pub use crate::error::{Result, RhymeError};
