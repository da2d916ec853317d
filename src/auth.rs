//! Simulated login check.
//!
//! Credentials are compared in plaintext against the table loaded from the
//! customer CSV. There is no hashing, lockout or rate limiting: this is a
//! prototype gate that only decides which customer's records the
//! retriever may see.

use std::collections::HashMap;

use tracing::{debug, warn};

pub struct AuthGate {
    credentials: HashMap<String, String>,
}

impl AuthGate {
    pub fn new(credentials: HashMap<String, String>) -> Self {
        Self { credentials }
    }

    /// Returns `true` when `customer_id` exists and its stored password
    /// equals `secret`. Both inputs are trimmed first.
    pub fn check(&self, customer_id: &str, secret: &str) -> bool {
        let id = customer_id.trim();
        let Some(stored) = self.credentials.get(id) else {
            warn!(customer_id = %id, "login failed: unknown customer");
            return false;
        };
        if stored.trim() == secret.trim() {
            debug!(customer_id = %id, "login succeeded");
            true
        } else {
            warn!(customer_id = %id, "login failed: wrong password");
            false
        }
    }
}
