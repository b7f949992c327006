pub mod config;
pub mod helper;
