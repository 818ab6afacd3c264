use actix_web::{Error, HttpResponse, get, post, web};
use common::NewTransaction;

use super::error_response;
use crate::state::AppState;

#[post("/payments/{payment_id}/transactions/")]
pub async fn create_transaction(
    path: web::Path<i64>,
    new_transaction: web::Json<NewTransaction>,
    app_state: web::Data<AppState>,
) -> Result<HttpResponse, Error> {
    let transaction = app_state
        .ledger
        .record_transaction(path.into_inner(), new_transaction.status.as_deref())
        .await
        .map_err(error_response)?;

    Ok(HttpResponse::Ok().json(transaction))
}

#[get("/users/{user_id}/transactions/")]
pub async fn get_user_transactions(
    path: web::Path<i64>,
    app_state: web::Data<AppState>,
) -> Result<HttpResponse, Error> {
    let transactions = app_state
        .ledger
        .list_transactions_for_user(path.into_inner())
        .await
        .map_err(error_response)?;

    Ok(HttpResponse::Ok().json(transactions))
}

#[get("/payments/{payment_id}/transactions/")]
pub async fn get_payment_transactions(
    path: web::Path<i64>,
    app_state: web::Data<AppState>,
) -> Result<HttpResponse, Error> {
    let transactions = app_state
        .ledger
        .transactions_for_payment(path.into_inner())
        .await
        .map_err(error_response)?;

    Ok(HttpResponse::Ok().json(transactions))
}
