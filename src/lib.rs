//! Stock Watch - back-in-stock alerts for an inventory API
//!
//! Polls a product list, detects products that newly came into stock and
//! sends one alert per transition. Transition history is kept on disk so a
//! restart neither repeats nor drops alerts.

pub mod config;
pub mod error;
pub mod fetcher;
pub mod notifier;
pub mod pincode;
pub mod poller;
pub mod state_store;
pub mod stock;
pub mod tracker;

pub use config::Config;
pub use error::{Result, StockError};
pub use fetcher::{Fetcher, RetryPolicy, Snapshot, SnapshotSource};
pub use notifier::{format_alert, Notifier, TelegramNotifier, TransitionRecord};
pub use pincode::{available_for_pincode, format_product_list, PincodeFilter};
pub use poller::{CycleReport, PollState, Poller};
pub use state_store::{PersistError, StockStateStore};
pub use stock::{normalize, ProductRecord};
pub use tracker::{Observation, StockState};
