pub mod loader;
pub mod types;

pub use loader::{load_transactions, parse_transactions, TransactionLog};
pub use types::{Action, TransactionRecord};
