pub mod acl;
pub mod jwt;
pub mod state_token;
