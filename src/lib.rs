pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod logging;
pub mod processor;
pub mod service;
pub mod utils;

pub use config::Settings;
pub use db::{InsertMode, MemoryStore, PostgresClient, Quote, QuoteFilter, QuoteStore, Token};
pub use error::{Error, Result};
pub use service::{Batch, QuoteQuery, QuoteService, TokenRegistry};
