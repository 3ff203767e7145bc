use base64::{prelude::BASE64_URL_SAFE_NO_PAD, Engine};
use rand_core::RngCore;

/// Random correlation value linking an authorization attempt to its callback.
pub fn generate_state_token() -> String {
    let mut bytes = [0u8; 32]; // 256-bit token
    rand_core::OsRng.fill_bytes(&mut bytes);
    BASE64_URL_SAFE_NO_PAD.encode(bytes)
}
