//! Service request model with its user and equipment links

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::services::conflicts::UniqueKeys;

/// Service request record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct ServiceRequest {
    pub id: i32,
    /// Business identifier, unique across requests
    pub contract_id: String,
    pub customer_id: i32,
    pub job_type_id: i32,
    pub description: Option<String>,
    pub is_completed: bool,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
    #[sqlx(skip)]
    #[serde(default)]
    pub assignees: Vec<UserServiceRequest>,
    #[sqlx(skip)]
    #[serde(default)]
    pub equipment: Vec<ServiceRequestEquipment>,
}

/// User assigned to a request. At most one link per request is primary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct UserServiceRequest {
    pub user_id: i32,
    pub assigned_at: DateTime<Utc>,
    pub is_primary_assignee: bool,
}

/// Equipment attached to a request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct ServiceRequestEquipment {
    pub equipment_id: Uuid,
    pub attached_at: DateTime<Utc>,
    pub notes: Option<String>,
}

/// Assign a user to a request
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, ToSchema)]
pub struct AssignUser {
    pub user_id: i32,
    #[serde(default)]
    pub is_primary: bool,
}

/// Attach equipment to a request
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, ToSchema)]
pub struct AttachEquipment {
    pub equipment_id: Uuid,
    pub notes: Option<String>,
}

/// Create service request
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, Validate, ToSchema)]
pub struct CreateServiceRequest {
    #[validate(length(min = 1, max = 100, message = "Contract id must be 1-100 characters"))]
    pub contract_id: String,
    pub customer_id: i32,
    pub job_type_id: i32,
    pub description: Option<String>,
    #[serde(default)]
    pub assignees: Vec<AssignUser>,
    #[serde(default)]
    pub equipment: Vec<AttachEquipment>,
}

/// Request about to be inserted with its link rows; the store assigns the id
#[derive(Debug, Clone, PartialEq)]
pub struct NewServiceRequest {
    pub contract_id: String,
    pub customer_id: i32,
    pub job_type_id: i32,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub assignees: Vec<UserServiceRequest>,
    pub equipment: Vec<ServiceRequestEquipment>,
}

impl ServiceRequest {
    /// The primary assignee link, if any
    pub fn primary_assignee(&self) -> Option<&UserServiceRequest> {
        self.assignees.iter().find(|link| link.is_primary_assignee)
    }
}

impl UniqueKeys for CreateServiceRequest {
    fn unique_keys(&self) -> Vec<&str> {
        vec![self.contract_id.as_str()]
    }
}
