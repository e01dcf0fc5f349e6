pub mod config;
pub mod direction;
