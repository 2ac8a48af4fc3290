//! Role identities used to log in against the store API

use serde::{Deserialize, Serialize};

/// A named test credential representing one authorization role
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    /// Name referenced by probes (e.g., "admin", "customer")
    pub name: String,

    /// Login email
    pub email: String,

    /// Login password
    pub password: String,

    /// Declared role label (e.g., "ADMIN", "CUSTOMER")
    pub role: String,
}

impl Identity {
    pub fn new(
        name: impl Into<String>,
        email: impl Into<String>,
        password: impl Into<String>,
        role: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
            password: password.into(),
            role: role.into(),
        }
    }

    /// The three identities seeded by the store's development database
    pub fn store_defaults() -> Vec<Identity> {
        vec![
            Identity::new("admin", "admin@store.com", "admin123", "ADMIN"),
            Identity::new("customer", "customer@test.com", "customer123", "CUSTOMER"),
            Identity::new("super_admin", "super@admin.com", "superpass123", "SUPER_ADMIN"),
        ]
    }
}

// Passwords stay out of logs.
impl std::fmt::Debug for Identity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Identity")
            .field("name", &self.name)
            .field("email", &self.email)
            .field("password", &"***")
            .field("role", &self.role)
            .finish()
    }
}
