pub mod extractor;
pub mod matrix;

pub use extractor::{extract_features, wallet_features};
pub use matrix::{FeatureMatrix, WalletFeatures, FEATURE_NAMES};
