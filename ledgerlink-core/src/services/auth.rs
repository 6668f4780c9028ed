//! Registration service - business account creation

use std::sync::Arc;

use argon2::password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;

use crate::domain::result::{Error, Result};
use crate::domain::Business;
use crate::ports::{DocumentStore, ProviderAdapter};

/// Result of a successful registration
#[derive(Debug, Clone)]
pub struct RegisteredBusiness {
    pub business: Business,
    /// Payment-provider authorize URL, handed back so onboarding can go
    /// straight into the connect flow
    pub payment_authorize_url: String,
}

/// Business registration over the store and the payment provider
pub struct RegistrationService {
    store: Arc<dyn DocumentStore>,
    payment_provider: Arc<dyn ProviderAdapter>,
}

impl RegistrationService {
    pub fn new(store: Arc<dyn DocumentStore>, payment_provider: Arc<dyn ProviderAdapter>) -> Self {
        Self {
            store,
            payment_provider,
        }
    }

    /// Register a new business.
    ///
    /// All three fields are required; the email must be unused. The password
    /// is stored as an argon2 hash only.
    pub async fn register(&self, name: &str, email: &str, password: &str) -> Result<RegisteredBusiness> {
        let name = name.trim();
        let email = email.trim();
        if name.is_empty() || email.is_empty() || password.is_empty() {
            return Err(Error::validation(
                "All fields (name, email, password) are required",
            ));
        }

        if self.store.get_business_by_email(email).await?.is_some() {
            return Err(Error::Duplicate(format!(
                "Business already exists for {}",
                email
            )));
        }

        let password_hash = hash_password(password)?;
        let business = Business::new(name.to_string(), email.to_string(), password_hash);
        self.store.insert_business(&business).await?;

        tracing::info!(business_id = %business.id, "business registered");

        Ok(RegisteredBusiness {
            payment_authorize_url: self.payment_provider.authorize_url(business.id),
            business,
        })
    }
}

/// Hash a password with argon2 and a fresh random salt
pub fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| Error::Other(format!("Password hashing failed: {}", e)))
}

/// Verify a password against a stored argon2 hash
pub fn verify_password(password: &str, password_hash: &str) -> Result<bool> {
    let parsed = PasswordHash::new(password_hash)
        .map_err(|e| Error::Other(format!("Corrupt password hash: {}", e)))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}
