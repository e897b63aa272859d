//! Operator account types

use serde::{Deserialize, Serialize};
use typed_builder::TypedBuilder;

/// Normalized operator account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Account id, from `id` or `pk` (numbers are stringified)
    pub id: String,
    /// Account email, empty when the backend omitted it
    #[serde(default)]
    pub email: String,
    /// Username
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    /// First name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    /// Last name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    /// Staff flag
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_staff: Option<bool>,
}

impl User {
    /// Name to greet the operator with: full name, then username, then email
    #[must_use]
    pub fn display_name(&self) -> String {
        let full = [self.first_name.as_deref(), self.last_name.as_deref()]
            .into_iter()
            .flatten()
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join(" ");

        if !full.is_empty() {
            return full;
        }
        self.username
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map_or_else(|| self.email.clone(), str::to_string)
    }
}

/// Fields accepted by `PUT /api/auth/profile/`. Unset fields are omitted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, TypedBuilder)]
pub struct ProfileUpdate {
    /// New email
    #[builder(default, setter(strip_option, into))]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// New username
    #[builder(default, setter(strip_option, into))]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    /// New first name
    #[builder(default, setter(strip_option, into))]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    /// New last name
    #[builder(default, setter(strip_option, into))]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
}
