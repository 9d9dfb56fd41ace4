use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::PaginationConfig;
use crate::domain::order::{CreateOrder, OrderError, OrderStatus, ServiceId, UpdateOrder};
use crate::query::{OrderFilter, PageRequest, PageRequestError, Sort};

use super::error::ApiErrorKind;

pub const MAX_COMMENT_LENGTH: usize = 1000;

// ============================================================================
// Request DTOs
// ============================================================================

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderRequest {
    pub owner_id: Uuid,
    pub service_id: ServiceId,
    #[serde(default)]
    pub comment: Option<String>,
}

impl CreateOrderRequest {
    pub fn into_command(self) -> Result<CreateOrder, ApiErrorKind> {
        if self.service_id <= 0 {
            return Err(ApiErrorKind::BadRequest(format!(
                "serviceId must be positive, got {}",
                self.service_id
            )));
        }
        check_comment(self.comment.as_deref())?;

        Ok(CreateOrder {
            owner_id: self.owner_id,
            service_id: self.service_id,
            comment: self.comment,
        })
    }
}

/// `status` stays a plain string here so an unknown name is reported as
/// "no such order status" rather than as a malformed body.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateOrderRequest {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub comment: Option<String>,
}

impl UpdateOrderRequest {
    pub fn into_command(self) -> Result<UpdateOrder, ApiErrorKind> {
        check_comment(self.comment.as_deref())?;
        let status = self
            .status
            .as_deref()
            .map(str::parse::<OrderStatus>)
            .transpose()?;

        Ok(UpdateOrder {
            status,
            comment: self.comment,
        })
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListOrdersQuery {
    pub page: Option<u32>,
    pub size: Option<u32>,
    pub sort: Option<String>,
    pub owner_id: Option<Uuid>,
    pub service_id: Option<ServiceId>,
    pub status: Option<String>,
}

impl ListOrdersQuery {
    pub fn page_request(&self, pagination: &PaginationConfig) -> Result<PageRequest, PageRequestError> {
        let size = self.size.unwrap_or(pagination.default_page_size);
        let request = PageRequest::bounded(self.page.unwrap_or(0), size, pagination.max_page_size)?;

        match self.sort.as_deref() {
            Some(raw) if !raw.trim().is_empty() => Ok(request.with_sort(raw.parse::<Sort>()?)),
            _ => Ok(request),
        }
    }

    pub fn filter(&self) -> Result<OrderFilter, OrderError> {
        let status = self
            .status
            .as_deref()
            .map(str::parse::<OrderStatus>)
            .transpose()?;

        Ok(OrderFilter::build(self.owner_id, None)
            .service(self.service_id)
            .status(status))
    }
}

fn check_comment(comment: Option<&str>) -> Result<(), ApiErrorKind> {
    match comment {
        Some(text) if text.chars().count() > MAX_COMMENT_LENGTH => Err(ApiErrorKind::BadRequest(format!(
            "comment must be at most {MAX_COMMENT_LENGTH} characters"
        ))),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::page::{SortDirection, SortField};

    #[test]
    fn test_create_request_validation() {
        let request: CreateOrderRequest = serde_json::from_value(serde_json::json!({
            "ownerId": Uuid::new_v4(),
            "serviceId": 0
        }))
        .unwrap();
        assert!(matches!(request.into_command(), Err(ApiErrorKind::BadRequest(_))));

        let request = CreateOrderRequest {
            owner_id: Uuid::new_v4(),
            service_id: 3,
            comment: Some("x".repeat(MAX_COMMENT_LENGTH + 1)),
        };
        assert!(request.into_command().is_err());
    }

    #[test]
    fn test_update_request_unknown_status() {
        let request = UpdateOrderRequest {
            status: Some("SHIPPED".to_string()),
            comment: None,
        };
        assert!(matches!(
            request.into_command(),
            Err(ApiErrorKind::Order(OrderError::NoSuchStatus(name))) if name == "SHIPPED"
        ));
    }

    #[test]
    fn test_update_request_parses_status() {
        let request = UpdateOrderRequest {
            status: Some("in_progress".to_string()),
            comment: Some("note".to_string()),
        };
        let update = request.into_command().unwrap();
        assert_eq!(update.status, Some(OrderStatus::InProgress));
        assert_eq!(update.comment.as_deref(), Some("note"));
    }

    #[test]
    fn test_list_query_defaults() {
        let pagination = PaginationConfig::default();
        let page = ListOrdersQuery::default().page_request(&pagination).unwrap();
        assert_eq!(page, PageRequest::new(0, pagination.default_page_size));
        assert!(ListOrdersQuery::default().filter().unwrap().is_unrestricted());
    }

    #[test]
    fn test_list_query_sort_and_bounds() {
        let pagination = PaginationConfig::default();
        let query = ListOrdersQuery {
            page: Some(1),
            size: Some(5),
            sort: Some("createdAt,desc".to_string()),
            ..Default::default()
        };
        let page = query.page_request(&pagination).unwrap();
        assert_eq!(page.sort.field, SortField::CreatedAt);
        assert_eq!(page.sort.direction, SortDirection::Desc);

        let query = ListOrdersQuery {
            size: Some(500),
            ..Default::default()
        };
        assert!(query.page_request(&pagination).is_err());
    }

    #[test]
    fn test_list_query_filter_predicates() {
        let query = ListOrdersQuery {
            owner_id: Some(Uuid::new_v4()),
            status: Some("CONFIRMED".to_string()),
            ..Default::default()
        };
        assert_eq!(query.filter().unwrap().predicates().len(), 2);

        let query = ListOrdersQuery {
            status: Some("LOST".to_string()),
            ..Default::default()
        };
        assert!(query.filter().is_err());
    }
}
