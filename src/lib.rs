pub mod classifier;
pub mod cli;
pub mod config;
pub mod logging;
pub mod notifier;
pub mod portal;
pub mod scanner;
pub mod utils;
pub mod watcher;
