//! Persistence seams for orders and identities.
//!
//! Handlers and the lifecycle engine only see these traits; the backend is
//! chosen when `AppState` is built and injected from there.

pub mod memory;

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::models::courier::Courier;
use crate::models::order::{CourierAssignment, DeliveryOrder, OrderStatus};
use crate::models::user::User;

pub use memory::MemoryStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{0}")]
    Duplicate(String),

    #[error("store operation timed out after {0:?}")]
    Timeout(std::time::Duration),

    #[error("store backend error: {0}")]
    Backend(String),
}

/// Result of a conditional single-record update.
#[derive(Debug, Clone)]
pub enum ConditionalUpdate {
    /// Precondition held and the write landed; carries the updated record.
    Applied(DeliveryOrder),
    /// No order with that id.
    Missing,
    /// Precondition failed; carries the record as it was observed.
    Rejected(DeliveryOrder),
}

#[async_trait]
pub trait OrderRepository: Send + Sync {
    async fn insert(&self, order: DeliveryOrder) -> Result<(), StoreError>;

    async fn get(&self, id: Uuid) -> Result<Option<DeliveryOrder>, StoreError>;

    async fn list_by_user(&self, user_id: Uuid) -> Result<Vec<DeliveryOrder>, StoreError>;

    async fn list_by_courier(&self, courier_id: Uuid) -> Result<Vec<DeliveryOrder>, StoreError>;

    async fn list_all(&self) -> Result<Vec<DeliveryOrder>, StoreError>;

    /// Writes the assignment only while the order has no courier email.
    async fn assign_if_unassigned(
        &self,
        id: Uuid,
        assignment: CourierAssignment,
    ) -> Result<ConditionalUpdate, StoreError>;

    /// Overwrites the assignment only while the order already has one.
    async fn reassign_if_assigned(
        &self,
        id: Uuid,
        assignment: CourierAssignment,
    ) -> Result<ConditionalUpdate, StoreError>;

    /// Sets the assignment and `Accepted` status unless already accepted.
    async fn accept_if_not_accepted(
        &self,
        id: Uuid,
        assignment: CourierAssignment,
    ) -> Result<ConditionalUpdate, StoreError>;

    async fn set_status(
        &self,
        id: Uuid,
        status: OrderStatus,
    ) -> Result<Option<DeliveryOrder>, StoreError>;

    /// Removes the order, returning it if it existed.
    async fn delete(&self, id: Uuid) -> Result<Option<DeliveryOrder>, StoreError>;

    async fn count(&self) -> Result<usize, StoreError>;
}

/// Users, admins and couriers. Email lookups are case-sensitive exact matches.
#[async_trait]
pub trait IdentityStore: Send + Sync {
    /// Fails with `Duplicate` if a user with the same email exists.
    async fn insert_user(&self, user: User) -> Result<(), StoreError>;

    /// Fails with `Duplicate` if a courier with the same email exists.
    async fn insert_courier(&self, courier: Courier) -> Result<(), StoreError>;

    async fn find_user_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError>;

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;

    /// Matches on email and the admin role in one lookup.
    async fn find_admin_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;

    async fn find_courier_by_email(&self, email: &str) -> Result<Option<Courier>, StoreError>;

    async fn list_users(&self) -> Result<Vec<User>, StoreError>;

    async fn user_count(&self) -> Result<usize, StoreError>;

    async fn courier_count(&self) -> Result<usize, StoreError>;
}
