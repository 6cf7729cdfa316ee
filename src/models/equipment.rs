//! Equipment model (self-referencing tree of components)

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::services::conflicts::UniqueKeys;

/// Equipment node. `components` is only populated when a tree is assembled;
/// flat reads leave it empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Equipment {
    pub id: Uuid,
    /// Owning node, `None` for a root
    pub parent_id: Option<Uuid>,
    pub name: String,
    pub model: Option<String>,
    /// Uniqueness key when present
    pub serial_number: Option<String>,
    pub manufacturer: Option<String>,
    pub quantity: i32,
    pub security_level_id: Option<i32>,
    /// User responsible for the equipment
    pub executor_id: Option<i32>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
    #[sqlx(skip)]
    #[serde(default)]
    pub inspection_method_ids: Vec<i32>,
    #[sqlx(skip)]
    #[serde(default)]
    pub attachments: Vec<Attachment>,
    #[sqlx(skip)]
    #[serde(default)]
    pub components: Vec<Equipment>,
}

/// Attachment metadata; file contents live outside the database
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Attachment {
    pub id: Uuid,
    pub equipment_id: Uuid,
    pub file_name: String,
    pub content_type: Option<String>,
    pub size_bytes: Option<i64>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, Validate, ToSchema)]
pub struct CreateAttachment {
    #[validate(length(min = 1, message = "File name is required"))]
    pub file_name: String,
    pub content_type: Option<String>,
    pub size_bytes: Option<i64>,
}

/// Create equipment request, components nested to any depth
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, Validate, ToSchema)]
pub struct CreateEquipment {
    #[validate(length(min = 1, max = 200, message = "Name must be 1-200 characters"))]
    pub name: String,
    pub model: Option<String>,
    pub serial_number: Option<String>,
    pub manufacturer: Option<String>,
    /// Defaults to 1
    pub quantity: Option<i32>,
    pub security_level_id: Option<i32>,
    pub executor_id: Option<i32>,
    #[serde(default)]
    pub inspection_method_ids: Vec<i32>,
    #[serde(default)]
    #[validate(nested)]
    pub attachments: Vec<CreateAttachment>,
    #[serde(default)]
    #[validate(nested)]
    pub components: Vec<CreateEquipment>,
}

/// Update equipment request. Parent and components are not editable here:
/// nodes are never re-pointed once created.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, Validate, ToSchema)]
pub struct UpdateEquipment {
    pub id: Uuid,
    #[validate(length(min = 1, max = 200, message = "Name must be 1-200 characters"))]
    pub name: Option<String>,
    pub model: Option<String>,
    pub serial_number: Option<String>,
    pub manufacturer: Option<String>,
    pub quantity: Option<i32>,
    pub security_level_id: Option<i32>,
    pub executor_id: Option<i32>,
}

impl UpdateEquipment {
    /// Copy every provided field onto `equipment`
    pub fn merge_into(&self, equipment: &mut Equipment) {
        if let Some(ref name) = self.name {
            equipment.name = name.clone();
        }
        if let Some(ref model) = self.model {
            equipment.model = Some(model.clone());
        }
        if let Some(ref serial_number) = self.serial_number {
            equipment.serial_number = Some(serial_number.clone());
        }
        if let Some(ref manufacturer) = self.manufacturer {
            equipment.manufacturer = Some(manufacturer.clone());
        }
        if let Some(quantity) = self.quantity {
            equipment.quantity = quantity;
        }
        if let Some(security_level_id) = self.security_level_id {
            equipment.security_level_id = Some(security_level_id);
        }
        if let Some(executor_id) = self.executor_id {
            equipment.executor_id = Some(executor_id);
        }
    }
}

impl CreateEquipment {
    /// Visit this node and every nested component, pre-order
    pub fn walk<'a>(&'a self, visit: &mut dyn FnMut(&'a CreateEquipment)) {
        visit(self);
        for component in &self.components {
            component.walk(visit);
        }
    }
}

impl UniqueKeys for CreateEquipment {
    /// Serial numbers of the whole subtree
    fn unique_keys(&self) -> Vec<&str> {
        let mut keys = Vec::new();
        self.walk(&mut |node| {
            if let Some(ref serial) = node.serial_number {
                keys.push(serial.as_str());
            }
        });
        keys
    }
}
