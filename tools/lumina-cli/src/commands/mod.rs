pub mod config;
pub mod fit;
pub mod toasts;
