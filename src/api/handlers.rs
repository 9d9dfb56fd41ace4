use actix_web::http::header;
use actix_web::{web, HttpRequest, HttpResponse};

use super::error::{ApiError, ApiErrorKind};
use super::types::{CreateOrderRequest, ListOrdersQuery, UpdateOrderRequest};
use super::ApiState;
use crate::domain::order::{OrderId, TransitionAction};
use crate::enrichment::ORDERS_PATH;

type ApiResult = Result<HttpResponse, ApiError>;

/// POST /orders
pub async fn create_order(
    req: HttpRequest,
    state: web::Data<ApiState>,
    body: web::Json<CreateOrderRequest>,
) -> ApiResult {
    let at = |e: ApiErrorKind| ApiError::new(e, req.path());

    let command = body.into_inner().into_command().map_err(at)?;
    let view = state
        .service
        .create_order(command)
        .await
        .map_err(|e| at(e.into()))?;

    Ok(HttpResponse::Created()
        .insert_header((header::LOCATION, format!("{ORDERS_PATH}/{}", view.id)))
        .json(view))
}

/// GET /orders/{id}
pub async fn get_order(req: HttpRequest, state: web::Data<ApiState>, path: web::Path<OrderId>) -> ApiResult {
    let view = state
        .service
        .get_order(path.into_inner())
        .await
        .map_err(|e| ApiError::new(e, req.path()))?;

    Ok(HttpResponse::Ok().json(view))
}

/// PATCH /orders/{id}
pub async fn update_order(
    req: HttpRequest,
    state: web::Data<ApiState>,
    path: web::Path<OrderId>,
    body: web::Json<UpdateOrderRequest>,
) -> ApiResult {
    let at = |e: ApiErrorKind| ApiError::new(e, req.path());

    let update = body.into_inner().into_command().map_err(at)?;
    let view = state
        .service
        .update_order(path.into_inner(), update)
        .await
        .map_err(|e| at(e.into()))?;

    Ok(HttpResponse::Ok().json(view))
}

/// POST /orders/{id}/{action} where action is confirm, cancel, in-progress or complete
pub async fn transition_order(
    req: HttpRequest,
    state: web::Data<ApiState>,
    path: web::Path<(OrderId, String)>,
) -> ApiResult {
    let (id, action) = path.into_inner();

    let action = TransitionAction::ALL
        .into_iter()
        .find(|candidate| candidate.rel() == action)
        .ok_or_else(|| ApiError::new(ApiErrorKind::NotFound(format!("No such order action: {action}")), req.path()))?;

    let view = state
        .service
        .change_status(id, action.target_status())
        .await
        .map_err(|e| ApiError::new(e, req.path()))?;

    Ok(HttpResponse::Ok().json(view))
}

/// GET /orders?page=&size=&sort=&ownerId=&serviceId=&status=
pub async fn list_orders(
    req: HttpRequest,
    state: web::Data<ApiState>,
    query: web::Query<ListOrdersQuery>,
) -> ApiResult {
    let at = |e: ApiErrorKind| ApiError::new(e, req.path());

    let page = query.page_request(&state.pagination).map_err(|e| at(e.into()))?;
    let filter = query.filter().map_err(|e| at(e.into()))?;

    let orders = state
        .service
        .list_orders_matching(&page, &filter)
        .await
        .map_err(|e| at(e.into()))?;

    Ok(HttpResponse::Ok().json(orders))
}
