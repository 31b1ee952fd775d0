//! Explicit session context threaded through every service call.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Missing or unusable session data; the caller should send the user to login.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Login required: {0}")]
pub struct AuthRequired(pub String);

/// Actor role.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Role {
    Admin,
    Reception,
    Veterinarian,
    Sales,
    Customer,
}

impl Role {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_lowercase().as_str() {
            "admin" | "administrator" => Some(Role::Admin),
            "reception" | "receptionist" | "letan" | "lễ tân" => Some(Role::Reception),
            "vet" | "veterinarian" | "doctor" | "bacsi" | "bác sĩ" => Some(Role::Veterinarian),
            "sales" | "seller" | "banhang" | "bán hàng" => Some(Role::Sales),
            "customer" | "user" | "khachhang" | "khách hàng" => Some(Role::Customer),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Reception => "reception",
            Role::Veterinarian => "veterinarian",
            Role::Sales => "sales",
            Role::Customer => "customer",
        }
    }

    pub fn is_staff(&self) -> bool {
        !matches!(self, Role::Customer)
    }
}

/// The `user` record kept in client storage.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StoredUser {
    #[serde(alias = "userId", alias = "user_id")]
    pub id: Option<i64>,
    #[serde(alias = "roleName")]
    pub role: Option<String>,
    #[serde(alias = "customer_id")]
    pub customer_id: Option<i64>,
}

/// Everything the client keeps in storage between screens.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StoredSession {
    pub user: Option<StoredUser>,
    pub employee_id: Option<i64>,
    pub branch_id: Option<i64>,
    pub token: Option<String>,
}

/// Who is acting, and where.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SessionContext {
    pub role: Role,
    pub user_id: i64,
    pub customer_id: Option<i64>,
    pub employee_id: Option<i64>,
    pub branch_id: Option<i64>,
}

impl SessionContext {
    /// Session for a customer using self-service screens.
    pub fn customer(user_id: i64, customer_id: i64) -> Self {
        Self {
            role: Role::Customer,
            user_id,
            customer_id: Some(customer_id),
            employee_id: None,
            branch_id: None,
        }
    }

    /// Session for a staff member working at `branch_id`.
    pub fn staff(role: Role, employee_id: i64, branch_id: i64) -> Self {
        Self {
            role,
            user_id: employee_id,
            customer_id: None,
            employee_id: Some(employee_id),
            branch_id: Some(branch_id),
        }
    }

    /// Build the context from persisted client state.
    pub fn from_stored(stored: &StoredSession) -> Result<Self, AuthRequired> {
        if stored.token.as_deref().map_or(true, |t| t.trim().is_empty()) {
            return Err(AuthRequired("no session token".into()));
        }
        let user = stored
            .user
            .as_ref()
            .ok_or_else(|| AuthRequired("no stored user".into()))?;
        let user_id = user
            .id
            .ok_or_else(|| AuthRequired("stored user has no id".into()))?;
        let role = user
            .role
            .as_deref()
            .and_then(Role::parse)
            .ok_or_else(|| AuthRequired("stored user has no known role".into()))?;

        let context = Self {
            role,
            user_id,
            customer_id: user.customer_id.or((role == Role::Customer).then_some(user_id)),
            employee_id: stored.employee_id,
            branch_id: stored.branch_id,
        };

        match role {
            Role::Customer if context.customer_id.is_none() => {
                Err(AuthRequired("customer session without customer id".into()))
            }
            // Admins work across branches
            Role::Admin => Ok(context),
            r if r.is_staff() && context.branch_id.is_none() => {
                Err(AuthRequired("staff session without branch".into()))
            }
            _ => Ok(context),
        }
    }

    pub fn require_customer(&self) -> Result<i64, AuthRequired> {
        self.customer_id
            .ok_or_else(|| AuthRequired("customer session required".into()))
    }

    pub fn require_branch(&self) -> Result<i64, AuthRequired> {
        self.branch_id
            .ok_or_else(|| AuthRequired("branch assignment required".into()))
    }

    /// Whether this session may act on records of `branch_id`.
    pub fn covers_branch(&self, branch_id: i64) -> bool {
        match self.role {
            Role::Admin => true,
            Role::Customer => false,
            _ => self.branch_id == Some(branch_id),
        }
    }
}
