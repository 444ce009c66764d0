//! API key generation for `sluice keygen`.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use rand::rngs::OsRng;
use rand::RngCore;

/// Random URL-safe key from `bytes` bytes of OS entropy
pub fn generate(bytes: usize) -> String {
    let mut buf = vec![0u8; bytes];
    OsRng.fill_bytes(&mut buf);
    URL_SAFE_NO_PAD.encode(&buf)
}

/// Setup text for a freshly generated key
pub fn instructions(key: &str) -> String {
    format!(
        "Add to the server environment (or .env):\n\
         \n  API_KEY_ENABLED=true\
         \n  MCP_API_KEY={key}\n\
         \nClients send it on every /mcp request:\n\
         \n  Authorization: Bearer {key}\n"
    )
}
