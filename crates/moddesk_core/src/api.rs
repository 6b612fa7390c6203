//! Typed endpoint adapters for the external HTTP layer.
//!
//! # Responsibility
//! - Parse assignment endpoint payloads into validated typed input.
//! - Map service errors to a transport-agnostic status so callers can
//!   distinguish "not found" from "ok" from "invalid".
//!
//! # Invariants
//! - A malformed payload is rejected before any mutation is attempted.
//! - Duplicate user ids in a payload collapse into one membership entry.

use crate::model::content::{ArticleId, CategoryId};
use crate::model::{UserId, ValidationError};
use crate::repo::assignment_repo::AssignmentRepository;
use crate::repo::RepoError;
use crate::service::assignment_service::AssignmentService;
use crate::service::ServiceError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Raw id value as delivered by the transport: a number or a numeric string.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum IdValue {
    Number(i64),
    Text(String),
}

impl IdValue {
    fn parse(&self, field: &'static str) -> Result<i64, ValidationError> {
        match self {
            Self::Number(value) => Ok(*value),
            Self::Text(value) => value.trim().parse::<i64>().map_err(|_| {
                ValidationError::NonNumericId {
                    field,
                    value: value.clone(),
                }
            }),
        }
    }
}

/// Payload of the category assignment endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct CategoryAssignmentRequest {
    #[serde(alias = "categoryId")]
    pub category_id: IdValue,
    #[serde(alias = "userIds")]
    pub user_ids: Vec<IdValue>,
}

/// Payload of the article assignment endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct ArticleAssignmentRequest {
    #[serde(alias = "articleId")]
    pub article_id: IdValue,
    #[serde(alias = "userIds")]
    pub user_ids: Vec<IdValue>,
}

/// Transport-agnostic outcome of an endpoint call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ApiStatus {
    Ok,
    NotFound,
    InvalidRequest,
    Failed,
}

impl ApiStatus {
    /// Conventional HTTP status code for this outcome.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::Ok => 200,
            Self::NotFound => 404,
            Self::InvalidRequest => 422,
            Self::Failed => 500,
        }
    }
}

/// Endpoint response envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ApiResponse {
    pub status: ApiStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ApiResponse {
    fn ok() -> Self {
        Self {
            status: ApiStatus::Ok,
            message: None,
        }
    }

    fn error(status: ApiStatus, message: impl Into<String>) -> Self {
        Self {
            status,
            message: Some(message.into()),
        }
    }
}

/// Handles `{categoryId, userIds}`: converges the category's moderator set.
pub fn assign_category_moderators<A: AssignmentRepository>(
    service: &AssignmentService<A>,
    request: &CategoryAssignmentRequest,
) -> ApiResponse {
    let category_id: CategoryId = match request.category_id.parse("category_id") {
        Ok(value) => value,
        Err(err) => return ApiResponse::error(ApiStatus::InvalidRequest, err.to_string()),
    };
    let desired = match parse_user_ids(&request.user_ids) {
        Ok(value) => value,
        Err(err) => return ApiResponse::error(ApiStatus::InvalidRequest, err.to_string()),
    };

    match service.sync_category_assignments(category_id, &desired) {
        Ok(_) => ApiResponse::ok(),
        Err(err) => map_service_error(err),
    }
}

/// Handles `{articleId, userIds}`: converges one article's moderator set.
pub fn assign_article_moderators<A: AssignmentRepository>(
    service: &AssignmentService<A>,
    request: &ArticleAssignmentRequest,
) -> ApiResponse {
    let article_id: ArticleId = match request.article_id.parse("article_id") {
        Ok(value) => value,
        Err(err) => return ApiResponse::error(ApiStatus::InvalidRequest, err.to_string()),
    };
    let desired = match parse_user_ids(&request.user_ids) {
        Ok(value) => value,
        Err(err) => return ApiResponse::error(ApiStatus::InvalidRequest, err.to_string()),
    };

    match service.sync_article_assignments(article_id, &desired) {
        Ok(_) => ApiResponse::ok(),
        Err(err) => map_service_error(err),
    }
}

fn parse_user_ids(raw: &[IdValue]) -> Result<BTreeSet<UserId>, ValidationError> {
    let mut user_ids = BTreeSet::new();
    for value in raw {
        user_ids.insert(value.parse("user id")?);
    }
    Ok(user_ids)
}

fn map_service_error(err: ServiceError) -> ApiResponse {
    let status = match &err {
        ServiceError::Repo(
            RepoError::CategoryNotFound(_)
            | RepoError::ArticleNotFound(_)
            | RepoError::CommentNotFound(_)
            | RepoError::FlagNotFound(_),
        ) => ApiStatus::NotFound,
        ServiceError::Repo(RepoError::Validation(_)) => ApiStatus::InvalidRequest,
        ServiceError::Repo(_) | ServiceError::Notify(_) => ApiStatus::Failed,
    };
    ApiResponse::error(status, err.to_string())
}
