//! Data models

pub mod bulk;
pub mod equipment;
pub mod named;
pub mod service_request;
pub mod user;

// Re-export commonly used types
pub use bulk::{BulkResult, RejectReason};
pub use equipment::{Attachment, CreateEquipment, Equipment, UpdateEquipment};
pub use named::{CreateNamedEntity, EntityKind, NamedEntity, UpdateNamedEntity};
pub use service_request::{CreateServiceRequest, ServiceRequest, UserServiceRequest};
pub use user::{CreateUser, UpdateUser, User};
