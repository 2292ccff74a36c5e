use serde::{Deserialize, Serialize};

use super::{ValidationError, now_rfc3339, required};

pub const DEFAULT_ROLE: &str = "user";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewUserRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub role: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub role: String,
    #[serde(rename = "createdAt")]
    pub created_at: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RoleUpdateRequest {
    pub role: Option<String>,
}

fn normalize_role(role: Option<String>) -> String {
    role.map(|r| r.trim().to_lowercase())
        .filter(|r| !r.is_empty())
        .unwrap_or_else(|| DEFAULT_ROLE.to_string())
}

impl NewUserRequest {
    pub fn validate(self) -> Result<NewUser, ValidationError> {
        if self.name.is_none() || self.email.is_none() {
            return Err(ValidationError::new("name and email are required"));
        }

        Ok(NewUser {
            name: required(self.name, "name")?,
            email: required(self.email, "email")?.to_lowercase(),
            role: normalize_role(self.role),
            created_at: now_rfc3339(),
        })
    }
}

impl RoleUpdateRequest {
    pub fn validate(self) -> Result<String, ValidationError> {
        required(self.role, "role")
            .map(|r| r.to_lowercase())
            .map_err(|_| ValidationError::new("Role is required"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_defaults_to_user_and_is_lowercased() {
        let user = NewUserRequest {
            name: Some("Mia".to_string()),
            email: Some(" Mia@Example.COM ".to_string()),
            role: None,
        }
        .validate()
        .unwrap();
        assert_eq!(user.role, DEFAULT_ROLE);
        assert_eq!(user.email, "mia@example.com");

        let admin = NewUserRequest {
            name: Some("Root".to_string()),
            email: Some("root@example.com".to_string()),
            role: Some("Admin".to_string()),
        }
        .validate()
        .unwrap();
        assert_eq!(admin.role, "admin");
    }

    #[test]
    fn role_update_requires_a_role() {
        assert!(RoleUpdateRequest { role: None }.validate().is_err());
        assert!(RoleUpdateRequest { role: Some(" ".into()) }.validate().is_err());
        assert_eq!(
            RoleUpdateRequest { role: Some("Tutor".into()) }.validate().unwrap(),
            "tutor"
        );
    }
}
