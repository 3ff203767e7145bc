pub mod contact;
pub mod external_auth;
