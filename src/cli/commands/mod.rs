//! CLI command implementations.

mod ask;
mod chat;
mod config;
mod ingest;
mod init;
mod list;
mod remove;
mod search;

pub use ask::run_ask;
pub use chat::run_chat;
pub use config::run_config;
pub use ingest::run_ingest;
pub use init::run_init;
pub use list::run_list;
pub use remove::run_remove;
pub use search::run_search;
