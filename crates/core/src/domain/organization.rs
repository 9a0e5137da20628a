use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::OrganizationId;
use crate::errors::DomainError;

/// Tenant the dataset is generated for, looked up by its slug.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Organization {
    pub id: OrganizationId,
    pub slug: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

impl Organization {
    /// New tenant whose identifier depends only on the slug, so registering twice converges.
    pub fn register(
        slug: &str,
        name: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> Result<Self, DomainError> {
        validate_slug(slug)?;
        let digest = blake3::hash(format!("organization\0{slug}").as_bytes());
        let mut bytes = [0u8; 16];
        bytes.copy_from_slice(&digest.as_bytes()[..16]);

        Ok(Self {
            id: OrganizationId(Uuid::from_bytes(bytes).to_string()),
            slug: slug.to_string(),
            name: name.into(),
            created_at,
        })
    }
}

fn validate_slug(slug: &str) -> Result<(), DomainError> {
    let well_formed = !slug.is_empty()
        && slug.len() <= 64
        && !slug.starts_with('-')
        && !slug.ends_with('-')
        && slug.chars().all(|ch| ch.is_ascii_lowercase() || ch.is_ascii_digit() || ch == '-');
    if well_formed {
        Ok(())
    } else {
        Err(DomainError::InvariantViolation(format!(
            "organization slug `{slug}` must be 1-64 lowercase letters, digits or inner dashes"
        )))
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::Organization;

    #[test]
    fn identifier_depends_on_slug_only() {
        let first = Organization::register("acme", "Acme", Utc::now()).expect("valid slug");
        let again = Organization::register("acme", "Acme Renamed", Utc::now()).expect("valid");
        let other = Organization::register("globex", "Globex", Utc::now()).expect("valid");

        assert_eq!(first.id, again.id);
        assert_ne!(first.id, other.id);
    }

    #[test]
    fn malformed_slugs_are_rejected() {
        for slug in ["", "Acme", "-acme", "acme-", "acme corp"] {
            assert!(Organization::register(slug, "x", Utc::now()).is_err(), "{slug:?}");
        }
    }
}
