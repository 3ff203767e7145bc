pub mod auth_client;
pub mod errors;
pub mod formatter;
pub mod graph;
pub mod source;
