use actix_web::{Error, HttpResponse, get, post, web};
use common::{NewUser, ServiceError};

use super::error_response;
use crate::auth::AuthenticatedUser;
use crate::state::AppState;

#[post("/users/")]
pub async fn create_user(
    new_user: web::Json<NewUser>,
    app_state: web::Data<AppState>,
) -> Result<HttpResponse, Error> {
    let NewUser {
        name,
        email,
        password,
    } = new_user.into_inner();

    let user = app_state
        .identity
        .register(&name, &email, &password)
        .await
        .map_err(error_response)?;

    Ok(HttpResponse::Ok().json(user))
}

#[get("/users/me")]
pub async fn current_user(user: AuthenticatedUser) -> HttpResponse {
    HttpResponse::Ok().json(user.0)
}

#[get("/users/{user_id}")]
pub async fn get_user(
    path: web::Path<i64>,
    app_state: web::Data<AppState>,
) -> Result<HttpResponse, Error> {
    let user_id = path.into_inner();

    let user = app_state
        .identity
        .find_by_id(user_id)
        .await
        .map_err(error_response)?
        .ok_or_else(|| {
            log::warn!("User not found: {}", user_id);
            error_response(ServiceError::NotFound("User not found".to_string()))
        })?;

    Ok(HttpResponse::Ok().json(user))
}
