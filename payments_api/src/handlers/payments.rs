use actix_web::{Error, HttpResponse, get, post, web};
use common::{NewPayment, ServiceError};

use super::error_response;
use crate::state::AppState;

#[post("/payments/")]
pub async fn create_payment(
    new_payment: web::Json<NewPayment>,
    app_state: web::Data<AppState>,
) -> Result<HttpResponse, Error> {
    let payment = app_state
        .ledger
        .create_payment(
            new_payment.amount,
            new_payment.sender_id,
            new_payment.receiver_id,
        )
        .await
        .map_err(error_response)?;

    Ok(HttpResponse::Ok().json(payment))
}

#[get("/payments/{payment_id}")]
pub async fn get_payment(
    path: web::Path<i64>,
    app_state: web::Data<AppState>,
) -> Result<HttpResponse, Error> {
    let payment_id = path.into_inner();

    let payment = app_state
        .ledger
        .get_payment(payment_id)
        .await
        .map_err(error_response)?
        .ok_or_else(|| {
            log::warn!("Payment not found: {}", payment_id);
            error_response(ServiceError::NotFound("Payment not found".to_string()))
        })?;

    Ok(HttpResponse::Ok().json(payment))
}
