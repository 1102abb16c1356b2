pub mod config;
pub mod models;
pub mod services;
pub mod state;
pub mod storage;
pub mod utils;

pub use services::subscription::SubscriptionClient;
pub use state::AppState;
