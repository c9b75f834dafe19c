//! User management DTOs

use serde::{Deserialize, Serialize};
use spacebook_core::models::{UserInfo, UserRole};
use spacebook_core::traits::PaginationMeta;
use spacebook_services::{AccountChanges, NewAccount};
use validator::Validate;

/// Admin-side user creation
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateUserRequest {
    #[validate(length(min = 1, max = 100, message = "Name is required"))]
    pub name: String,

    #[validate(email(message = "Invalid email"))]
    pub email: String,

    #[validate(length(min = 6, message = "Password must be at least 6 characters"))]
    pub password: String,

    /// Defaults to `user`
    pub role: Option<UserRole>,
}

impl CreateUserRequest {
    pub fn into_parts(self) -> (NewAccount, UserRole) {
        (
            NewAccount {
                name: self.name,
                email: self.email,
                password: self.password,
            },
            self.role.unwrap_or_default(),
        )
    }
}

/// Partial user update
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateUserRequest {
    #[validate(length(min = 1, max = 100))]
    pub name: Option<String>,

    #[validate(email(message = "Invalid email"))]
    pub email: Option<String>,

    #[validate(length(min = 6, message = "Password must be at least 6 characters"))]
    pub password: Option<String>,

    pub role: Option<UserRole>,
}

impl From<UpdateUserRequest> for AccountChanges {
    fn from(req: UpdateUserRequest) -> Self {
        AccountChanges {
            name: req.name,
            email: req.email,
            password: req.password,
            role: req.role,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct UserResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<&'static str>,
    pub user: UserInfo,
}

#[derive(Debug, Clone, Serialize)]
pub struct UserListResponse {
    pub users: Vec<UserInfo>,
    pub pagination: PaginationMeta,
}
