mod app;
mod config;
mod effects;
mod logging;
mod render;
mod repl;

pub use app::run_app;
