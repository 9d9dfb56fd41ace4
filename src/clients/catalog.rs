use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use super::http::CollaboratorHttp;
use super::ClientError;
use crate::config::CollaboratorConfig;
use crate::domain::order::ServiceId;
use crate::metrics::Metrics;

/// Catalog entry as returned by the catalog service. Only existence matters here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceSummary {
    pub id: ServiceId,
    #[serde(default)]
    pub category_id: Option<i64>,
    #[serde(default)]
    pub owner_id: Option<Uuid>,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub image_urls: Vec<String>,
    /// Decimal, passed through as the catalog sent it
    #[serde(default)]
    pub price: Option<serde_json::Value>,
    #[serde(default)]
    pub priority: Option<i32>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub last_modified_at: Option<DateTime<Utc>>,
}

#[async_trait]
pub trait CatalogClient: Send + Sync {
    /// `Ok(None)` when the catalog has no such service
    async fn get_service_by_id(&self, id: ServiceId) -> Result<Option<ServiceSummary>, ClientError>;
}

/// `GET {base_url}/{id}` against the catalog service
#[derive(Debug)]
pub struct HttpCatalogClient {
    http: CollaboratorHttp,
}

impl HttpCatalogClient {
    pub const NAME: &'static str = "catalog";

    pub fn new(config: &CollaboratorConfig, metrics: Arc<Metrics>) -> Result<Self, ClientError> {
        Ok(Self {
            http: CollaboratorHttp::new(Self::NAME, config, metrics)?,
        })
    }
}

#[async_trait]
impl CatalogClient for HttpCatalogClient {
    async fn get_service_by_id(&self, id: ServiceId) -> Result<Option<ServiceSummary>, ClientError> {
        let url = self.http.url(&id.to_string())?;
        let service: Option<ServiceSummary> = self.http.get_json("catalog.get_service", url, &[]).await?;

        match &service {
            Some(s) => tracing::debug!(service_id = id, title = %s.title, "Catalog service found"),
            None => tracing::debug!(service_id = id, "Catalog service not found"),
        }
        Ok(service)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clients::http::{serve, test_config};
    use actix_web::{web, HttpResponse};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    async fn service_handler(path: web::Path<i64>, hits: web::Data<AtomicUsize>) -> HttpResponse {
        hits.fetch_add(1, Ordering::SeqCst);
        match path.into_inner() {
            1 => HttpResponse::Ok().json(serde_json::json!({
                "id": 1,
                "categoryId": 3,
                "ownerId": "7d444840-9dc0-11d1-b245-5ffdce74fad2",
                "title": "Gutter cleaning",
                "imageUrls": [],
                "price": 12.50,
                "priority": 1,
                "createdAt": "2024-05-01T10:00:00Z",
                "lastModifiedAt": "2024-05-01T10:00:00Z"
            })),
            2 => HttpResponse::NotFound().finish(),
            3 => HttpResponse::InternalServerError().body("boom"),
            _ => {
                actix_web::rt::time::sleep(Duration::from_secs(2)).await;
                HttpResponse::Ok().finish()
            }
        }
    }

    async fn catalog() -> (HttpCatalogClient, Arc<AtomicUsize>) {
        let hits = Arc::new(AtomicUsize::new(0));
        let data = hits.clone();
        let base = serve(move |cfg: &mut web::ServiceConfig| {
            cfg.app_data(web::Data::from(data.clone()))
                .route("/services/{id}", web::get().to(service_handler));
        })
        .await;

        let metrics = Arc::new(Metrics::new().unwrap());
        let client = HttpCatalogClient::new(&test_config(&format!("{base}/services")), metrics).unwrap();
        (client, hits)
    }

    #[actix_web::test]
    async fn test_existing_service_is_returned() {
        let (client, _) = catalog().await;
        let service = client.get_service_by_id(1).await.unwrap().unwrap();
        assert_eq!(service.id, 1);
        assert_eq!(service.title, "Gutter cleaning");
        assert_eq!(service.category_id, Some(3));
    }

    #[actix_web::test]
    async fn test_missing_service_is_none_not_error() {
        let (client, hits) = catalog().await;
        assert!(client.get_service_by_id(2).await.unwrap().is_none());
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[actix_web::test]
    async fn test_server_error_is_retried_then_surfaced() {
        let (client, hits) = catalog().await;
        let err = client.get_service_by_id(3).await.unwrap_err();
        assert!(matches!(err, ClientError::Api { status: 500, .. }));
        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }

    #[actix_web::test]
    async fn test_slow_catalog_times_out() {
        let (client, _) = catalog().await;
        let err = client.get_service_by_id(9).await.unwrap_err();
        assert!(err.is_timeout());
    }

    #[actix_web::test]
    async fn test_circuit_opens_after_repeated_failures() {
        let (client, hits) = catalog().await;
        for _ in 0..2 {
            assert!(client.get_service_by_id(3).await.is_err());
        }
        let seen = hits.load(Ordering::SeqCst);

        let err = client.get_service_by_id(1).await.unwrap_err();
        assert!(matches!(err, ClientError::CircuitOpen { .. }));
        assert_eq!(hits.load(Ordering::SeqCst), seen);
    }
}
