pub mod app;
pub mod tui;
pub mod util;
