use actix_web::{Error, HttpResponse, post, web};
use common::ServiceError;
use serde::{Deserialize, Serialize};

use super::error_response;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct LoginData {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AccessToken {
    pub access_token: String,
    pub token_type: String,
}

#[post("/token")]
pub async fn login_for_access_token(
    login_data: web::Form<LoginData>,
    app_state: web::Data<AppState>,
) -> Result<HttpResponse, Error> {
    let user = app_state
        .identity
        .verify_credentials(&login_data.username, &login_data.password)
        .await
        .map_err(error_response)?
        .ok_or_else(|| {
            error_response(ServiceError::Unauthorized(
                "Incorrect username or password".to_string(),
            ))
        })?;

    let access_token = app_state.tokens.issue(&user.email).map_err(|err| {
        log::error!("Failed to create access token: {:?}", err);
        error_response(ServiceError::Internal(err))
    })?;

    log::info!("Issued access token for user {}", user.id);
    Ok(HttpResponse::Ok().json(AccessToken {
        access_token,
        token_type: "bearer".to_string(),
    }))
}
