//! User record and create-user input

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::{Email, ValidationError};

/// Maximum length for names (matches `VARCHAR(255)`)
pub const MAX_NAME_LEN: usize = 255;

/// A stored user row.
///
/// Serialized with the column names the table uses: `createdAt`, `updatedAt`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: i32,
    pub email: String,
    pub name: String,
    #[sqlx(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
    #[sqlx(rename = "updatedAt")]
    pub updated_at: DateTime<Utc>,
}

/// Create-user request body, as received.
///
/// Missing fields deserialize as empty strings so they surface as
/// validation errors rather than body parse errors.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateUserDto {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub name: String,
}

/// Validated input for the store. Only constructible via [`NewUser::new`]
/// or `TryFrom<CreateUserDto>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUser {
    email: Email,
    name: String,
}

impl NewUser {
    pub fn new(email: &str, name: &str) -> Result<Self, ValidationError> {
        let email = Email::new(email)?;

        if name.trim().is_empty() {
            return Err(ValidationError::Empty { field: "name" });
        }
        if name.chars().count() > MAX_NAME_LEN {
            return Err(ValidationError::TooLong {
                field: "name",
                max: MAX_NAME_LEN,
            });
        }
        if name.chars().any(char::is_control) {
            return Err(ValidationError::InvalidFormat {
                field: "name",
                reason: "must not contain control characters",
            });
        }

        Ok(Self {
            email,
            name: name.to_owned(),
        })
    }

    pub fn email(&self) -> &str {
        self.email.as_str()
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl TryFrom<CreateUserDto> for NewUser {
    type Error = ValidationError;

    fn try_from(dto: CreateUserDto) -> Result<Self, Self::Error> {
        Self::new(&dto.email, &dto.name)
    }
}
