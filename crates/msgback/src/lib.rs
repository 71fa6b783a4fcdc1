pub mod config;
pub mod context;
pub mod convert;
pub mod error;
pub mod ledger;
pub mod metadata;
pub mod saga;
pub mod secrets;
pub mod select;
pub mod staging;
pub mod store;

pub use config::{load_config, Config, ConfigError};
pub use context::RunContext;
pub use error::{MsgbackError, Result};
pub use ledger::{FailureCategory, RunLedger};
pub use saga::{BatchError, BatchReport, MigrationSaga, ReversalReport, ReversalSaga};
pub use secrets::{resolve_secret, SecretError};
pub use staging::Staging;
pub use store::{RemoteStore, RestStore, StoreError};
