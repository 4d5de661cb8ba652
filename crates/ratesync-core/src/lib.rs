pub mod app_config;
pub mod config;
pub mod rating;

use thiserror::Error;

pub use app_config::{AppConfig, Environment};
pub use config::{load_app_config, load_app_config_from_env, MAX_INTERVAL_MINUTES, MIN_INTERVAL_MINUTES};
pub use rating::{aggregate_rating, round_rating, ProductRatingSample};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),
    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },
}

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("product {product_id} has an out-of-range average rating: {value}")]
    InvalidRating { product_id: String, value: f64 },
}
