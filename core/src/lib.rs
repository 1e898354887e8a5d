pub mod aggregate;
pub mod campaign;
pub mod config;
pub mod demo;
pub mod engine;
pub mod error;
pub mod evolution;
pub mod like_for_like;
pub mod name_generator;
pub mod rank;
pub mod report;
pub mod retention;
pub mod rng;
pub mod store;
pub mod tier;
pub mod transaction;
pub mod types;
