//! Lookup entities identified by a unique human-readable name
//! (customers, roles, job types, security levels, inspection methods)

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::Validate;

use crate::services::conflicts::UniqueKeys;

/// Which lookup table a named entity lives in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "kebab-case")]
pub enum EntityKind {
    Customers,
    Roles,
    JobTypes,
    SecurityLevels,
    InspectionMethods,
}

impl EntityKind {
    pub const ALL: [EntityKind; 5] = [
        EntityKind::Customers,
        EntityKind::Roles,
        EntityKind::JobTypes,
        EntityKind::SecurityLevels,
        EntityKind::InspectionMethods,
    ];

    pub fn table(&self) -> &'static str {
        match self {
            EntityKind::Customers => "customers",
            EntityKind::Roles => "roles",
            EntityKind::JobTypes => "job_types",
            EntityKind::SecurityLevels => "security_levels",
            EntityKind::InspectionMethods => "inspection_methods",
        }
    }

    /// URL segment the kind is served under
    pub fn slug(&self) -> &'static str {
        match self {
            EntityKind::Customers => "customers",
            EntityKind::Roles => "roles",
            EntityKind::JobTypes => "job-types",
            EntityKind::SecurityLevels => "security-levels",
            EntityKind::InspectionMethods => "inspection-methods",
        }
    }

    /// Singular label used in log lines and error messages
    pub fn label(&self) -> &'static str {
        match self {
            EntityKind::Customers => "Customer",
            EntityKind::Roles => "Role",
            EntityKind::JobTypes => "Job type",
            EntityKind::SecurityLevels => "Security level",
            EntityKind::InspectionMethods => "Inspection method",
        }
    }
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Persisted named entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct NamedEntity {
    pub id: i32,
    /// Unique name or code
    pub name: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Create request
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, Validate, ToSchema)]
pub struct CreateNamedEntity {
    #[validate(length(min = 1, max = 200, message = "Name must be 1-200 characters"))]
    pub name: String,
    pub description: Option<String>,
}

/// Update request; absent fields are left untouched
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, Validate, ToSchema)]
pub struct UpdateNamedEntity {
    /// Must match the path id on single updates
    pub id: i32,
    #[validate(length(min = 1, max = 200, message = "Name must be 1-200 characters"))]
    pub name: Option<String>,
    pub description: Option<String>,
}

/// Row about to be inserted; the store assigns the identifier
#[derive(Debug, Clone, PartialEq)]
pub struct NewNamedEntity {
    pub name: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl NewNamedEntity {
    pub fn from_request(data: &CreateNamedEntity, created_at: DateTime<Utc>) -> Self {
        Self {
            name: data.name.clone(),
            description: data.description.clone(),
            created_at,
        }
    }
}

impl UpdateNamedEntity {
    /// Copy every provided field onto `entity`
    pub fn merge_into(&self, entity: &mut NamedEntity) {
        if let Some(ref name) = self.name {
            entity.name = name.clone();
        }
        if let Some(ref description) = self.description {
            entity.description = Some(description.clone());
        }
    }
}

impl UniqueKeys for CreateNamedEntity {
    fn unique_keys(&self) -> Vec<&str> {
        vec![self.name.as_str()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_keeps_absent_fields() {
        let mut entity = NamedEntity {
            id: 4,
            name: "Acme".into(),
            description: Some("first".into()),
            created_at: Utc::now(),
            updated_at: None,
        };
        let update = UpdateNamedEntity {
            id: 4,
            name: None,
            description: Some("second".into()),
        };
        update.merge_into(&mut entity);

        assert_eq!(entity.name, "Acme");
        assert_eq!(entity.description.as_deref(), Some("second"));
    }

    #[test]
    fn test_kind_path_names() {
        let kind: EntityKind = serde_json::from_str("\"job-types\"").unwrap();
        assert_eq!(kind, EntityKind::JobTypes);
        assert_eq!(kind.table(), "job_types");

        for kind in EntityKind::ALL {
            let serialized = serde_json::to_value(kind).unwrap();
            assert_eq!(serialized, kind.slug());
        }
    }
}
