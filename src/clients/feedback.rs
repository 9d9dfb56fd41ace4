use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use super::http::CollaboratorHttp;
use super::ClientError;
use crate::config::CollaboratorConfig;
use crate::domain::order::{OrderId, OwnerId};
use crate::metrics::Metrics;
use crate::query::Page;

/// Newest entries first
pub const FEEDBACK_SORT: &str = "createdAt,desc";

/// A customer's rating of a fulfilled order, owned by the feedback service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackView {
    pub id: i64,
    pub order_id: OrderId,
    pub owner_id: Uuid,
    pub rating: i32,
    #[serde(default)]
    pub comment: Option<String>,
    pub created_at: DateTime<Utc>,
    pub last_modified_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedbackQuery {
    pub page_size: u32,
    pub owner_id: Option<OwnerId>,
    pub order_id: Option<OrderId>,
}

impl FeedbackQuery {
    /// Newest feedback for one order
    pub fn latest_for_order(order_id: OrderId) -> Self {
        Self {
            page_size: 1,
            owner_id: None,
            order_id: Some(order_id),
        }
    }

    fn to_params(&self) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("page", "0".to_string()),
            ("size", self.page_size.to_string()),
        ];
        if let Some(owner_id) = self.owner_id {
            params.push(("ownerId", owner_id.to_string()));
        }
        if let Some(order_id) = self.order_id {
            params.push(("orderId", order_id.to_string()));
        }
        params.push(("sort", FEEDBACK_SORT.to_string()));
        params
    }
}

#[async_trait]
pub trait FeedbackClient: Send + Sync {
    async fn list_feedback(&self, query: &FeedbackQuery) -> Result<Page<FeedbackView>, ClientError>;
}

/// `GET {base_url}/v2?page=0&size=..&orderId=..&sort=createdAt,desc`
#[derive(Debug)]
pub struct HttpFeedbackClient {
    http: CollaboratorHttp,
}

impl HttpFeedbackClient {
    pub const NAME: &'static str = "feedback";

    pub fn new(config: &CollaboratorConfig, metrics: Arc<Metrics>) -> Result<Self, ClientError> {
        Ok(Self {
            http: CollaboratorHttp::new(Self::NAME, config, metrics)?,
        })
    }
}

#[async_trait]
impl FeedbackClient for HttpFeedbackClient {
    async fn list_feedback(&self, query: &FeedbackQuery) -> Result<Page<FeedbackView>, ClientError> {
        let url = self.http.url("v2")?;
        let page: Option<Page<FeedbackView>> = self
            .http
            .get_json("feedback.list", url, &query.to_params())
            .await?;

        // The listing endpoint itself missing is a deployment problem, not "no feedback"
        let page = page.ok_or_else(|| ClientError::api_error(404, "feedback listing endpoint not found"))?;

        tracing::debug!(
            order_id = ?query.order_id,
            returned = page.content.len(),
            total = page.total_elements,
            "Feedback listed"
        );
        Ok(page)
    }
}
