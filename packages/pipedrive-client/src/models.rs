//! Pipedrive API request and response models

use serde::{Deserialize, Serialize};

/// An email or phone entry on a person
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactField {
    /// Entry label (e.g., "work", "home", "mobile", "other")
    #[serde(default)]
    pub label: String,
    /// Address or number, stored verbatim by Pipedrive
    pub value: String,
    /// Whether this is the person's primary entry
    #[serde(default)]
    pub primary: bool,
}

impl ContactField {
    /// Create a new contact entry
    pub fn new(label: impl Into<String>, value: impl Into<String>, primary: bool) -> Self {
        Self {
            label: label.into(),
            value: value.into(),
            primary,
        }
    }

    /// Create a primary contact entry
    pub fn primary(label: impl Into<String>, value: impl Into<String>) -> Self {
        Self::new(label, value, true)
    }

    /// Create a secondary contact entry
    pub fn secondary(label: impl Into<String>, value: impl Into<String>) -> Self {
        Self::new(label, value, false)
    }
}

/// Organization reference carried on a person
///
/// Pipedrive embeds the organization as an object on reads but accepts
/// (and in some API versions returns) a bare id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OrgRef {
    /// Bare organization id
    Id(i64),
    /// Embedded organization summary
    Embedded {
        value: i64,
        #[serde(default)]
        name: Option<String>,
    },
}

impl OrgRef {
    /// Id of the referenced organization, whichever shape it came in
    pub fn id(&self) -> i64 {
        match self {
            OrgRef::Id(id) => *id,
            OrgRef::Embedded { value, .. } => *value,
        }
    }
}

/// A person record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Person {
    /// Id assigned by Pipedrive
    pub id: i64,
    /// Display name
    pub name: String,
    /// Email entries, in the order they were submitted
    #[serde(default, deserialize_with = "null_as_empty")]
    pub email: Vec<ContactField>,
    /// Phone entries, in the order they were submitted
    #[serde(default, deserialize_with = "null_as_empty")]
    pub phone: Vec<ContactField>,
    /// Linked organization, if any
    #[serde(default)]
    pub org_id: Option<OrgRef>,
    /// Label ids, in the order they were submitted
    #[serde(default, deserialize_with = "null_as_empty")]
    pub label_ids: Vec<i64>,
}

impl Person {
    /// Id of the linked organization
    pub fn organization_id(&self) -> Option<i64> {
        self.org_id.as_ref().map(OrgRef::id)
    }
}

/// An organization record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Organization {
    /// Id assigned by Pipedrive
    pub id: i64,
    /// Organization name
    pub name: String,
}

/// Payload for creating a person
///
/// Unset optional fields are left out of the request body entirely.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct NewPerson {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<Vec<ContactField>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<Vec<ContactField>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub org_id: Option<i64>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub label_ids: Vec<i64>,
}

impl NewPerson {
    /// Start a payload with just a name
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn email(mut self, email: Vec<ContactField>) -> Self {
        self.email = Some(email);
        self
    }

    pub fn phone(mut self, phone: Vec<ContactField>) -> Self {
        self.phone = Some(phone);
        self
    }

    /// Link the person to an organization; `None` leaves it unlinked
    pub fn org_id(mut self, org_id: impl Into<Option<i64>>) -> Self {
        self.org_id = org_id.into();
        self
    }

    pub fn label_ids(mut self, label_ids: Vec<i64>) -> Self {
        self.label_ids = label_ids;
        self
    }
}

/// Payload for creating an organization
#[derive(Debug, Serialize)]
pub(crate) struct NewOrganization<'a> {
    pub name: &'a str,
}

/// The `{"success": .., "data": ..}` wrapper around Pipedrive responses
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiEnvelope<T> {
    /// Whether Pipedrive reports the call as successful
    #[serde(default)]
    pub success: bool,
    /// Payload, absent on some error responses
    #[serde(default = "Option::default")]
    pub data: Option<T>,
}

/// Data returned by delete endpoints
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeletedEntity {
    pub id: i64,
}

/// Pipedrive error response body
#[derive(Debug, Deserialize)]
pub(crate) struct ErrorResponse {
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub error_info: Option<String>,
}

fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: serde::Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}
