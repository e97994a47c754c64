pub mod config;
pub mod controller;
pub mod stats;

pub use config::SessionConfig;
pub use controller::SessionController;
pub use stats::SessionStats;
