use serde::{Deserialize, Serialize};

use crate::utils::acl::any_acl_grants;

#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct Claims {
    pub sub: String, // user UUID the session belongs to
    #[serde(default)]
    pub acl: Vec<String>,
    pub exp: usize, // expiration (as UNIX timestamp)
}

impl Claims {
    pub fn has_acl(&self, required: &str) -> bool {
        any_acl_grants(&self.acl, required, &self.sub)
    }
}
