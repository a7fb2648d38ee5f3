pub mod commands;
pub mod config;
pub mod controllers;
pub mod error;
pub mod progress;
pub mod queue;
pub mod registry;
pub mod service;
pub mod state;
pub mod system;
pub mod traits;
