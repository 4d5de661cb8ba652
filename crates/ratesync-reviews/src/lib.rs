pub mod client;
pub mod error;
pub mod types;

pub use client::ReviewsClient;
pub use error::ReviewsError;
pub use types::{ReviewedProduct, VendorProductsResponse};
