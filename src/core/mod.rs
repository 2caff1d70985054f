pub mod actor;
pub mod cancel;
pub mod command;
pub mod commands;
pub mod config;
pub mod env;
pub mod queue;
pub mod rank;
pub mod store;
