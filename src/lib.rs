#![forbid(unsafe_code)]

pub mod archive;
pub mod cli;
pub mod config;
pub mod credentials;
pub mod dedup;
pub mod digest;
pub mod extract;
pub mod formats;
pub mod identity;
pub mod logging;
pub mod mail;
pub mod notify;
pub mod pipeline;
pub mod record_store;
pub mod scrape;
