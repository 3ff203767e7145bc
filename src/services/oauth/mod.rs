pub mod callback;
pub mod coordinator;
pub mod errors;
pub mod microsoft;
pub mod pending;
pub mod token_service;
