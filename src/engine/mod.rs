pub mod accounts;
pub mod enrichment;
pub mod lifecycle;

use std::future::Future;
use std::time::Duration;

use uuid::Uuid;

use crate::error::AppError;
use crate::store::StoreError;

/// Runs a store call under the per-request time budget.
pub(crate) async fn bounded<T, F>(limit: Duration, call: F) -> Result<T, AppError>
where
    F: Future<Output = Result<T, StoreError>>,
{
    let result = tokio::time::timeout(limit, call)
        .await
        .map_err(|_| StoreError::Timeout(limit))?;
    Ok(result?)
}

/// Parses the `userId` identity header.
pub fn parse_user_id(raw: Option<&str>) -> Result<Uuid, AppError> {
    let raw = raw
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .ok_or_else(|| AppError::Validation("UserID is required".to_string()))?;

    Uuid::parse_str(raw).map_err(|_| AppError::Validation("Invalid UserID format".to_string()))
}

pub fn parse_order_id(raw: &str) -> Result<Uuid, AppError> {
    Uuid::parse_str(raw.trim())
        .map_err(|_| AppError::Validation("Invalid OrderID format".to_string()))
}
