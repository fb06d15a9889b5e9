pub mod config;
pub mod score;
