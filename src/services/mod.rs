pub mod oauth;
pub mod office365;
