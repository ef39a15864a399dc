// src/core/mod.rs
pub mod codec;
pub mod converter;
pub mod dictionary;
pub mod engine;
pub mod finals;
pub mod index;
pub mod query;
pub mod types;
pub mod worker;
