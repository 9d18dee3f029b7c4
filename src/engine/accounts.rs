use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};
use uuid::Uuid;

use crate::config::AdminSeed;
use crate::engine::bounded;
use crate::error::AppError;
use crate::models::courier::{Courier, CourierRegistration};
use crate::models::user::{Credentials, Role, User, UserRegistration};
use crate::security::password::PasswordVerifier;
use crate::store::IdentityStore;

#[derive(Clone)]
pub struct AccountService {
    identities: Arc<dyn IdentityStore>,
    verifier: Arc<dyn PasswordVerifier>,
    store_timeout: Duration,
}

impl AccountService {
    pub fn new(
        identities: Arc<dyn IdentityStore>,
        verifier: Arc<dyn PasswordVerifier>,
        store_timeout: Duration,
    ) -> Self {
        Self {
            identities,
            verifier,
            store_timeout,
        }
    }

    pub async fn register_user(&self, payload: UserRegistration) -> Result<User, AppError> {
        require_email_and_password(&payload.email, &payload.password)?;

        let user = User::register(payload);
        bounded(self.store_timeout, self.identities.insert_user(user.clone()))
            .await
            .map_err(|err| duplicate_as("User already exists", err))?;

        info!(user_id = %user.id, "user registered");
        Ok(user)
    }

    pub async fn list_users(&self) -> Result<Vec<User>, AppError> {
        bounded(self.store_timeout, self.identities.list_users()).await
    }

    /// Returns the user id on success.
    pub async fn login_user(&self, credentials: Credentials) -> Result<Uuid, AppError> {
        let user = bounded(
            self.store_timeout,
            self.identities.find_user_by_email(&credentials.email),
        )
        .await?
        .ok_or_else(|| AppError::Unauthorized("User not found".to_string()))?;

        self.check_password(&credentials.password, &user.password)?;
        Ok(user.id)
    }

    pub async fn register_courier(&self, payload: CourierRegistration) -> Result<Courier, AppError> {
        require_email_and_password(&payload.email, &payload.password)?;

        let courier = Courier::register(payload);
        bounded(
            self.store_timeout,
            self.identities.insert_courier(courier.clone()),
        )
        .await
        .map_err(|err| duplicate_as("Courier already exists", err))?;

        info!(courier_id = %courier.id, "courier registered");
        Ok(courier)
    }

    /// Returns the courier's display name on success.
    pub async fn login_courier(&self, credentials: Credentials) -> Result<String, AppError> {
        let courier = bounded(
            self.store_timeout,
            self.identities.find_courier_by_email(&credentials.email),
        )
        .await?
        .ok_or_else(|| AppError::Unauthorized("Courier not found".to_string()))?;

        self.check_password(&credentials.password, &courier.password)?;
        Ok(courier.name)
    }

    /// Only records carrying the admin role can log in here.
    pub async fn login_admin(&self, credentials: Credentials) -> Result<Uuid, AppError> {
        let admin = bounded(
            self.store_timeout,
            self.identities.find_admin_by_email(&credentials.email),
        )
        .await?
        .ok_or_else(|| AppError::Unauthorized("Admin not found".to_string()))?;

        self.check_password(&credentials.password, &admin.password)?;
        Ok(admin.id)
    }

    /// Inserts the configured admin unless a user with that email exists.
    pub async fn seed_admin(&self, seed: &AdminSeed) -> Result<(), AppError> {
        let admin = User::with_role(
            UserRegistration {
                name: seed.name.clone(),
                email: seed.email.clone(),
                phone: String::new(),
                password: seed.password.clone(),
            },
            Role::Admin,
        );

        match bounded(self.store_timeout, self.identities.insert_user(admin)).await {
            Ok(()) => {
                info!(email = %seed.email, "admin user seeded");
                Ok(())
            }
            Err(AppError::Conflict(_)) => {
                warn!(email = %seed.email, "admin seed skipped: email already registered");
                Ok(())
            }
            Err(err) => Err(err),
        }
    }

    fn check_password(&self, supplied: &str, stored: &str) -> Result<(), AppError> {
        if self.verifier.verify(supplied, stored) {
            Ok(())
        } else {
            Err(AppError::Unauthorized("Invalid password".to_string()))
        }
    }
}

fn require_email_and_password(email: &str, password: &str) -> Result<(), AppError> {
    if email.trim().is_empty() {
        return Err(AppError::Validation("email cannot be empty".to_string()));
    }
    if password.is_empty() {
        return Err(AppError::Validation("password cannot be empty".to_string()));
    }
    Ok(())
}

fn duplicate_as(message: &str, err: AppError) -> AppError {
    match err {
        AppError::Conflict(_) => AppError::Conflict(message.to_string()),
        other => other,
    }
}
