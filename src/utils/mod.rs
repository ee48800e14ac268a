pub mod config;
pub mod data;
pub mod denylist;
pub mod http_client;
pub mod validators;
