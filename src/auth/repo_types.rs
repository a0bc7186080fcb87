use serde::{Deserialize, Serialize};

/// Bearer token record, keyed by `id` in the `tokens` collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    pub id: String,    // 20-char random key
    pub email: String, // owner
    pub expires: i64,  // unix milliseconds
}

impl Token {
    pub fn is_live_at(&self, now_ms: i64) -> bool {
        self.expires > now_ms
    }
}
