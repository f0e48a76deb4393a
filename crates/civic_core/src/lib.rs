pub mod categorize;
pub mod clock;
pub mod config;
pub mod db;
pub mod duplicates;
pub mod geo;
pub mod schema;
pub mod scoring;
