use crate::models::{
    errors::AppError,
    messages,
    user::{User, UserRole},
};

/// Gate for routes restricted to a set of roles
#[derive(Debug, Clone, Copy)]
pub struct RoleChecker {
    allowed: &'static [UserRole],
}

pub const ADMIN: RoleChecker = RoleChecker::new(&[UserRole::Admin]);
pub const ADMIN_MODERATOR: RoleChecker = RoleChecker::new(&[UserRole::Admin, UserRole::Moderator]);
pub const ANY_USER: RoleChecker =
    RoleChecker::new(&[UserRole::Admin, UserRole::Moderator, UserRole::User]);

impl RoleChecker {
    pub const fn new(allowed: &'static [UserRole]) -> Self {
        Self { allowed }
    }

    pub fn allows(&self, role: UserRole) -> bool {
        self.allowed.contains(&role)
    }

    pub fn check(&self, user: &User) -> Result<(), AppError> {
        if self.allows(user.role) {
            Ok(())
        } else {
            tracing::debug!("User {} ({}) denied by role check", user.id, user.role);
            Err(AppError::forbidden(messages::OPERATION_FORBIDDEN))
        }
    }
}
