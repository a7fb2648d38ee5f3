pub mod hook;
pub mod log;
