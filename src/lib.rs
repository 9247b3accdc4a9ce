pub mod app;
pub mod cards;
pub mod config;
pub mod dataset;
pub mod dispatch;
pub mod errors;
pub mod filter;
pub mod handlers;
pub mod models;
pub mod patch;
pub mod projection;
pub mod state;
pub mod storage;
pub mod ui;

pub use app::router;
pub use config::AppConfig;
pub use state::{AppState, DashboardContext};
pub use storage::load_store;
