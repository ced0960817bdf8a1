// src/identity.rs - Who is looking at the chat

use std::sync::{Arc, RwLock};

/// Supplies the login of the viewing user; empty when not authenticated
pub trait IdentityProvider: Send + Sync {
    fn logged_in_username(&self) -> String;
}

/// Fixed login, typically from configuration
#[derive(Debug, Clone, Default)]
pub struct StaticIdentity {
    username: String,
}

impl StaticIdentity {
    pub fn new(username: impl Into<String>) -> Self {
        Self {
            username: username.into(),
        }
    }

    pub fn anonymous() -> Self {
        Self::default()
    }
}

impl IdentityProvider for StaticIdentity {
    fn logged_in_username(&self) -> String {
        self.username.clone()
    }
}

/// Login that the session layer can swap after authenticating
#[derive(Debug, Clone, Default)]
pub struct SessionIdentity {
    username: Arc<RwLock<String>>,
}

impl SessionIdentity {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_username(&self, username: impl Into<String>) {
        match self.username.write() {
            Ok(mut guard) => *guard = username.into(),
            Err(poisoned) => *poisoned.into_inner() = username.into(),
        }
    }

    pub fn clear(&self) {
        self.set_username(String::new());
    }
}

impl IdentityProvider for SessionIdentity {
    fn logged_in_username(&self) -> String {
        match self.username.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}
