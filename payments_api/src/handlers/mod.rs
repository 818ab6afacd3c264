mod auth;
mod payments;
mod transactions;
mod users;

use actix_web::{
    Error, HttpResponse, Responder, error::InternalError, get, http::StatusCode, http::header, web,
};
pub use auth::*;
use common::ServiceError;
pub use payments::*;
pub use transactions::*;
pub use users::*;

#[get("/")]
pub async fn index() -> impl Responder {
    HttpResponse::Ok().json(serde_json::json!({ "message": "Welcome to our B2B payments api" }))
}

/// Registers every route and the body-extractor error handlers.
pub fn routes(cfg: &mut web::ServiceConfig) {
    cfg.app_data(web::JsonConfig::default().error_handler(|err, _req| {
        detail_error(StatusCode::UNPROCESSABLE_ENTITY, err.to_string())
    }))
    .app_data(web::FormConfig::default().error_handler(|err, _req| {
        detail_error(StatusCode::UNPROCESSABLE_ENTITY, err.to_string())
    }))
    .service(index)
    .service(login_for_access_token)
    .service(create_user)
    // `/users/me` must be registered before `/users/{user_id}`
    .service(current_user)
    .service(get_user)
    .service(get_user_transactions)
    .service(create_payment)
    .service(get_payment)
    .service(create_transaction)
    .service(get_payment_transactions);
}

/// Maps a domain failure onto its HTTP status with a `{"detail": ...}` body.
pub fn error_response(err: ServiceError) -> Error {
    let status = match &err {
        ServiceError::NotFound(_) => StatusCode::NOT_FOUND,
        ServiceError::Conflict(_) => StatusCode::BAD_REQUEST,
        ServiceError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
        ServiceError::Declined(_) => StatusCode::PAYMENT_REQUIRED,
        ServiceError::Internal(e) => {
            log::error!("Request failed: {:#}", e);
            return detail_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error. Please try again later.".to_string(),
            );
        }
    };
    detail_error(status, err.to_string())
}

fn detail_error(status: StatusCode, detail: String) -> Error {
    let mut response = HttpResponse::build(status);
    if status == StatusCode::UNAUTHORIZED {
        response.insert_header((header::WWW_AUTHENTICATE, "Bearer"));
    }
    let response = response.json(serde_json::json!({ "detail": detail }));
    InternalError::from_response(detail, response).into()
}
