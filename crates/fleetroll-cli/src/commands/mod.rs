pub mod config;
pub mod invoke;
pub mod simulate;
