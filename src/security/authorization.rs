//! Capability checks run before every mutating lifecycle call.
//!
//! `Permissive` allows everything, which is how the service has always
//! behaved: any caller holding an order id may cancel, accept or decline it.
//! `Strict` binds each mutation to the principal that is allowed to make it.

use std::fmt;
use std::sync::Arc;

use tracing::warn;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::order::DeliveryOrder;

/// The principal a request acts as.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Actor {
    Anonymous,
    User(Uuid),
    Courier(String),
    Admin,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Cancel,
    Accept,
    Decline,
    Assign,
    Reassign,
    SetStatus,
    Delete,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Action::Cancel => "cancel",
            Action::Accept => "accept",
            Action::Decline => "decline",
            Action::Assign => "assign",
            Action::Reassign => "reassign",
            Action::SetStatus => "set_status",
            Action::Delete => "delete",
        };
        f.write_str(name)
    }
}

pub trait Authorizer: Send + Sync {
    fn authorize(
        &self,
        actor: &Actor,
        action: Action,
        order: &DeliveryOrder,
    ) -> Result<(), AppError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthorizationMode {
    Permissive,
    Strict,
}

impl AuthorizationMode {
    pub fn authorizer(self) -> Arc<dyn Authorizer> {
        match self {
            AuthorizationMode::Permissive => Arc::new(Permissive),
            AuthorizationMode::Strict => Arc::new(Strict),
        }
    }
}

impl std::str::FromStr for AuthorizationMode {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.to_ascii_lowercase().as_str() {
            "permissive" => Ok(AuthorizationMode::Permissive),
            "strict" => Ok(AuthorizationMode::Strict),
            other => Err(format!("unknown authorization mode '{other}'")),
        }
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct Permissive;

impl Authorizer for Permissive {
    fn authorize(&self, _: &Actor, _: Action, _: &DeliveryOrder) -> Result<(), AppError> {
        Ok(())
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct Strict;

impl Authorizer for Strict {
    fn authorize(
        &self,
        actor: &Actor,
        action: Action,
        order: &DeliveryOrder,
    ) -> Result<(), AppError> {
        let allowed = match (action, actor) {
            (_, Actor::Admin) => true,
            (Action::Cancel, Actor::User(user_id)) => *user_id == order.user_id,
            (Action::Accept | Action::Decline, Actor::Courier(email)) => order
                .courier_email()
                .is_none_or(|assigned| assigned == email.as_str()),
            _ => false,
        };

        if allowed {
            return Ok(());
        }

        warn!(order_id = %order.id, action = %action, actor = ?actor, "authorization denied");
        Err(AppError::Forbidden(format!(
            "not allowed to {action} order {}",
            order.id
        )))
    }
}
