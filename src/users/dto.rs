use std::fmt;

use serde::Deserialize;

/// Request body for `POST /register`.
///
/// Every field is optional at the wire level so that a missing field is
/// reported as a validation error rather than a deserialization failure.
#[derive(Default, Deserialize)]
pub struct RegisterRequest {
    pub fullname: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub password: Option<String>,
    pub country: Option<String>,
    pub gender: Option<String>,
}

impl fmt::Debug for RegisterRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegisterRequest")
            .field("fullname", &self.fullname)
            .field("email", &self.email)
            .field("phone", &self.phone)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("country", &self.country)
            .field("gender", &self.gender)
            .finish()
    }
}

/// A registration with every required field present and non-empty.
pub struct Registration {
    pub fullname: String,
    pub email: String,
    pub phone: String,
    pub password: String,
    pub country: String,
    pub gender: String,
}

/// Why a request failed the boundary checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Invalid {
    /// A required field is absent or empty.
    Missing,
    /// A field holds U+0000, which Postgres text columns cannot store.
    NulByte,
}

impl RegisterRequest {
    /// Presence check only, plus a NUL check. `fullname` and `email` are trimmed first.
    pub fn validate(self) -> Result<Registration, Invalid> {
        fn required(v: Option<String>) -> Result<String, Invalid> {
            let v = v.filter(|s| !s.is_empty()).ok_or(Invalid::Missing)?;
            if v.contains('\0') {
                return Err(Invalid::NulByte);
            }
            Ok(v)
        }
        fn trimmed(v: Option<String>) -> Result<String, Invalid> {
            required(v.map(|s| s.trim().to_string()))
        }

        Ok(Registration {
            fullname: trimmed(self.fullname)?,
            email: trimmed(self.email)?,
            phone: required(self.phone)?,
            password: required(self.password)?,
            country: required(self.country)?,
            gender: required(self.gender)?,
        })
    }
}
