//! Role domain: the signed-in user's dashboard role.

pub mod client;

use crate::cache::CacheKey;
use crate::error::FetchError;
use crate::fallback::FallbackPolicy;
use crate::source::{decode_json, Decode};
use serde::{Deserialize, Serialize};

/// Response of `GET /api/get-role`.
#[derive(Deserialize, Debug, Clone)]
pub struct RoleResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct UserRole {
    pub email: String,
    /// `None` when the backend reports no role for the user.
    pub role: Option<String>,
}

impl UserRole {
    pub fn is(&self, role: &str) -> bool {
        self.role
            .as_deref()
            .is_some_and(|r| r.eq_ignore_ascii_case(role))
    }

    pub fn is_admin(&self) -> bool {
        self.is("admin")
    }
}

impl From<RoleResponse> for UserRole {
    fn from(r: RoleResponse) -> Self {
        Self {
            email: r.email.unwrap_or_default(),
            role: if r.success { r.role } else { None },
        }
    }
}

impl Decode for UserRole {
    fn decode(payload: serde_json::Value) -> Result<Self, FetchError> {
        decode_json::<RoleResponse>(payload).map(UserRole::from)
    }
}

/// Role-less placeholder for the email the key was built for.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoRole;

impl FallbackPolicy<UserRole> for NoRole {
    fn fallback(&self, key: &CacheKey) -> UserRole {
        let email = key
            .params
            .iter()
            .find(|(k, _)| k == "email")
            .map(|(_, v)| v.clone())
            .unwrap_or_default();
        UserRole { email, role: None }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::Endpoint;
    use serde_json::json;

    #[test]
    fn test_decode_role() {
        let role = UserRole::decode(json!({"success": true, "email": "a@b.c", "role": "Admin"})).unwrap();
        assert!(role.is_admin());

        let missing = UserRole::decode(json!({"success": false, "email": "a@b.c", "role": "admin"})).unwrap();
        assert_eq!(missing.role, None);

        assert!(matches!(
            UserRole::decode(json!(["admin"])),
            Err(FetchError::Schema(_))
        ));
    }

    #[test]
    fn test_fallback_uses_key_email() {
        let key = CacheKey::new(Endpoint::Role).param("email", "x@y.z");
        let role = NoRole.fallback(&key);
        assert_eq!(role.email, "x@y.z");
        assert!(!role.is_admin());
    }
}
