use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Operator role. Upstream encodes roles inconsistently (numeric ids, numeric
/// strings, names); everything goes through [`Role::normalize`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase", try_from = "RawRole")]
pub enum Role {
    Admin,
    Receptionist,
    Doctor,
    Patient,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawRole {
    Id(i64),
    Code(String),
}

impl TryFrom<RawRole> for Role {
    type Error = String;

    fn try_from(raw: RawRole) -> Result<Self, Self::Error> {
        let role = match &raw {
            RawRole::Id(id) => Role::from_id(*id),
            RawRole::Code(code) => Role::normalize(code),
        };
        role.ok_or_else(|| match raw {
            RawRole::Id(id) => format!("Unknown role id: {}", id),
            RawRole::Code(code) => format!("Unknown role code: {}", code),
        })
    }
}

impl Role {
    pub fn from_id(id: i64) -> Option<Self> {
        match id {
            1 => Some(Role::Admin),
            2 => Some(Role::Receptionist),
            3 => Some(Role::Doctor),
            4 => Some(Role::Patient),
            _ => None,
        }
    }

    /// Single normalization point for role codes: `"1"`, `"admin"`, `"ROLE_ADMIN"`, ...
    pub fn normalize(code: &str) -> Option<Self> {
        let code = code.trim();
        if let Ok(id) = code.parse::<i64>() {
            return Role::from_id(id);
        }

        let lowered = code.to_ascii_lowercase();
        let name = lowered.strip_prefix("role_").unwrap_or(&lowered);
        match name {
            "admin" | "administrator" => Some(Role::Admin),
            "receptionist" | "reception" | "staff" => Some(Role::Receptionist),
            "doctor" => Some(Role::Doctor),
            "patient" => Some(Role::Patient),
            _ => None,
        }
    }

    pub fn is_admin(&self) -> bool {
        matches!(self, Role::Admin)
    }
}
