//! The signed-in employee's profile record.
//!
//! Only the fields the session core reads or writes are typed. Everything
//! else the profile service returns rides along in [`UserRecord::extra`] and
//! is written back untouched.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Keys that must never reach persisted storage.
const SECRET_FIELDS: &[&str] = &["password", "confirmPassword", "currentPassword"];

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRecord {
    /// Ids and email stay loose: some services send numeric ids.
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    object_id: Option<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    id: Option<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    email: Option<Value>,

    /// Kept loose: older records carry non-string roles that must be ignored, not rejected.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<Value>,

    /// Either a plain id or a populated organization object.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    organization_id: Option<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile_image: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile_photo_url: Option<String>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl UserRecord {
    /// Minimal record for a login response that carried no user.
    pub fn from_email(email: impl Into<String>) -> Self {
        Self {
            email: Some(Value::String(email.into())),
            ..Self::default()
        }
    }

    /// Identifier used by the employee service (`_id` wins over `id`).
    /// Numeric ids come back in their decimal form.
    pub fn id(&self) -> Option<String> {
        [&self.object_id, &self.id]
            .into_iter()
            .flatten()
            .find_map(scalar_id)
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.object_id = Some(Value::String(id.into()));
        self
    }

    pub fn email(&self) -> Option<&str> {
        self.email
            .as_ref()
            .and_then(Value::as_str)
            .filter(|email| !email.is_empty())
    }

    /// Role when stored as a non-empty string.
    pub fn role(&self) -> Option<&str> {
        self.role
            .as_ref()
            .and_then(Value::as_str)
            .filter(|role| !role.is_empty())
    }

    pub fn set_role(&mut self, role: impl Into<String>) {
        self.role = Some(Value::String(role.into()));
    }

    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.set_role(role);
        self
    }

    pub fn organization_id(&self) -> Option<String> {
        match self.organization_id.as_ref()? {
            Value::Object(org) => ["_id", "id"]
                .into_iter()
                .filter_map(|key| org.get(key))
                .find_map(scalar_id),
            other => scalar_id(other),
        }
    }

    pub fn with_organization_id(mut self, organization_id: impl Into<String>) -> Self {
        self.organization_id = Some(Value::String(organization_id.into()));
        self
    }

    /// Copies `profilePhotoUrl` into an empty `profileImage`.
    ///
    /// Returns whether the record changed; a second call is always a no-op.
    pub fn normalize_photo(&mut self) -> bool {
        let image_missing = self.profile_image.as_deref().is_none_or(str::is_empty);
        match self.profile_photo_url.as_deref() {
            Some(url) if image_missing && !url.is_empty() => {
                self.profile_image = Some(url.to_string());
                true
            }
            _ => false,
        }
    }

    /// Avatar as the leave tracker shows it: uploaded URL first, then the normalized image.
    pub fn avatar_url(&self) -> Option<&str> {
        self.profile_photo_url
            .as_deref()
            .filter(|url| !url.is_empty())
            .or_else(|| self.profile_image.as_deref().filter(|url| !url.is_empty()))
    }

    pub fn display_name(&self) -> Option<String> {
        let part = |key: &str| {
            self.extra
                .get(key)
                .and_then(Value::as_str)
                .map(str::trim)
                .filter(|s| !s.is_empty())
        };
        let full = [part("firstName"), part("lastName")]
            .into_iter()
            .flatten()
            .collect::<Vec<_>>()
            .join(" ");
        if !full.is_empty() {
            return Some(full);
        }
        part("name")
            .map(str::to_string)
            .or_else(|| self.email().map(str::to_string))
    }

    /// Drops password-like fields so they are never persisted.
    pub fn strip_secrets(&mut self) {
        for key in SECRET_FIELDS {
            self.extra.remove(*key);
        }
    }
}

fn scalar_id(value: &Value) -> Option<String> {
    match value {
        Value::String(id) if !id.is_empty() => Some(id.clone()),
        Value::Number(id) => Some(id.to_string()),
        _ => None,
    }
}
