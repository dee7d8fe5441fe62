pub mod app;
pub mod config;
pub mod errors;
pub mod fetcher;
pub mod filter;
pub mod handlers;
pub mod models;
pub mod normalize;
pub mod presenter;
pub mod state;
pub mod stats;
pub mod ui;

pub use app::router;
pub use config::DashboardConfig;
pub use fetcher::TimeEntriesClient;
pub use state::AppState;
