use std::sync::Arc;

use time::OffsetDateTime;
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    error::AppError,
    users::{
        dto::{Invalid, RegisterRequest},
        password::hash_password_blocking,
        repo::{StoreError, UserStore},
        repo_types::{PublicUser, User},
    },
};

pub const MSG_FIELDS_REQUIRED: &str = "All fields are required.";
pub const MSG_FIELD_NUL: &str = "Fields must not contain NUL characters.";
pub const MSG_EMAIL_TAKEN: &str = "Email already registered.";
pub const MSG_REGISTER_FAILED: &str = "Server error, please try again later.";
pub const MSG_LIST_FAILED: &str = "Error fetching users";

/// Registration write path: validate, check email, hash, persist.
#[derive(Clone)]
pub struct RegistrationService {
    store: Arc<dyn UserStore>,
}

impl RegistrationService {
    pub fn new(store: Arc<dyn UserStore>) -> Self {
        Self { store }
    }

    pub async fn register(&self, req: RegisterRequest) -> Result<(), AppError> {
        let reg = match req.validate() {
            Ok(reg) => reg,
            Err(Invalid::Missing) => {
                warn!("registration missing required field");
                return Err(AppError::Validation(MSG_FIELDS_REQUIRED.into()));
            }
            Err(Invalid::NulByte) => {
                warn!("registration field contains NUL");
                return Err(AppError::Validation(MSG_FIELD_NUL.into()));
            }
        };

        match self.store.find_by_email(&reg.email).await {
            Ok(Some(_)) => {
                warn!(email = %reg.email, "email already registered");
                return Err(AppError::Conflict(MSG_EMAIL_TAKEN.into()));
            }
            Ok(None) => {}
            Err(e) => return Err(AppError::internal(MSG_REGISTER_FAILED, e)),
        }

        let password_hash = hash_password_blocking(reg.password)
            .await
            .map_err(|e| AppError::internal(MSG_REGISTER_FAILED, e))?;

        let user = User {
            id: Uuid::new_v4(),
            fullname: reg.fullname,
            email: reg.email,
            phone: reg.phone,
            password_hash,
            country: reg.country,
            gender: reg.gender,
            created_at: OffsetDateTime::now_utc(),
        };

        match self.store.insert(&user).await {
            Ok(()) => {
                info!(user_id = %user.id, email = %user.email, "user registered");
                Ok(())
            }
            // Lost a race with a concurrent registration for the same email.
            Err(StoreError::UniquenessViolation) => {
                warn!(email = %user.email, "email already registered at insert");
                Err(AppError::Conflict(MSG_EMAIL_TAKEN.into()))
            }
            Err(e) => Err(AppError::internal(MSG_REGISTER_FAILED, e)),
        }
    }

    pub async fn list_users(&self) -> Result<Vec<PublicUser>, AppError> {
        self.store
            .list_all()
            .await
            .map_err(|e| AppError::internal(MSG_LIST_FAILED, e))
    }
}
