pub mod config;
pub mod plot;
pub mod render;
pub mod results;
