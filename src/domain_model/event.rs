use crate::domain_model::UserId;
use serde::{Deserialize, Serialize};

/// Payload published when a user registers.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct UserEvent {
    pub id: UserId,
    pub username: String,
    pub created_at: String,
    pub updated_at: String,
}

/// Every event the backend publishes.
#[derive(Debug, Clone)]
pub enum DomainEvent {
    UserRegistered(UserEvent),
}

impl DomainEvent {
    pub fn key(&self) -> String {
        match self {
            DomainEvent::UserRegistered(e) => format!("{}-{}", e.id, e.username),
        }
    }

    pub fn payload(&self) -> serde_json::Result<Vec<u8>> {
        match self {
            DomainEvent::UserRegistered(e) => serde_json::to_vec(e),
        }
    }
}
