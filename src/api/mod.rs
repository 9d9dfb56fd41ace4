// ============================================================================
// HTTP API - actix-web surface for the order lifecycle
// ============================================================================
//
//   POST  /orders                     create
//   GET   /orders                     list (page, size, sort, ownerId, serviceId, status)
//   GET   /orders/{id}                fetch
//   PATCH /orders/{id}                partial update (status name, comment)
//   POST  /orders/{id}/{action}       confirm | cancel | in-progress | complete
//
// Errors are problem documents, see error.rs.
// ============================================================================

pub mod error;
mod handlers;
pub mod types;

use actix_web::{web, HttpRequest};

use crate::config::PaginationConfig;
use crate::service::OrderLifecycleService;
use error::{ApiError, ApiErrorKind};

/// Shared handler state
pub struct ApiState {
    pub service: OrderLifecycleService,
    pub pagination: PaginationConfig,
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(
        web::JsonConfig::default()
            .limit(64 * 1024)
            .error_handler(|err, req| bad_request(err.to_string(), req)),
    )
    .app_data(web::QueryConfig::default().error_handler(|err, req| bad_request(err.to_string(), req)))
    .service(
        web::resource("/orders")
            .route(web::post().to(handlers::create_order))
            .route(web::get().to(handlers::list_orders)),
    )
    .service(
        web::resource("/orders/{id}")
            .route(web::get().to(handlers::get_order))
            .route(web::patch().to(handlers::update_order)),
    )
    .service(web::resource("/orders/{id}/{action}").route(web::post().to(handlers::transition_order)));
}

fn bad_request(detail: String, req: &HttpRequest) -> actix_web::Error {
    ApiError::new(ApiErrorKind::BadRequest(detail), req.path()).into()
}
