//! Random and canned person payloads for contract tests

use fake::faker::internet::en::SafeEmail;
use fake::faker::name::en::Name;
use fake::faker::phone_number::en::PhoneNumber;
use fake::Fake;
use pipedrive_client::{ContactField, NewPerson};

/// Label ids used by the label round-trip cases
pub const KNOWN_LABEL_IDS: [i64; 2] = [14, 16];

/// Builder for person payloads
#[derive(Debug, Clone, Copy)]
pub struct PersonFixture;

impl PersonFixture {
    /// A random full name
    pub fn random_name() -> String {
        Name().fake()
    }

    /// A primary work address followed by a secondary home address
    pub fn random_emails() -> Vec<ContactField> {
        vec![
            ContactField::primary("work", SafeEmail().fake::<String>()),
            ContactField::secondary("home", SafeEmail().fake::<String>()),
        ]
    }

    /// A primary mobile number followed by a secondary work number
    pub fn random_phones() -> Vec<ContactField> {
        vec![
            ContactField::primary("mobile", PhoneNumber().fake::<String>()),
            ContactField::secondary("work", PhoneNumber().fake::<String>()),
        ]
    }

    /// A person using every creation parameter, linked to `org_id`
    pub fn all_params(org_id: i64) -> NewPerson {
        NewPerson::new(Self::random_name())
            .email(Self::random_emails())
            .phone(Self::random_phones())
            .label_ids(KNOWN_LABEL_IDS.to_vec())
            .org_id(org_id)
    }

    /// A single primary entry under `label`
    pub fn single(label: &str, value: &str) -> Vec<ContactField> {
        vec![ContactField::primary(label, value)]
    }
}
