/// Account endpoints: registration, login, profile and deletion
use crate::{
    account::{LoginRequest, RegisterRequest, UpdateProfileRequest},
    api::response::{json_body, ApiResponse},
    auth::AuthContext,
    context::AppContext,
    db::account::Profile,
    error::ApiResult,
};
use axum::{
    extract::{rejection::JsonRejection, State},
    response::IntoResponse,
    routing::{delete, get, post},
    Json, Router,
};

/// Build auth routes
pub fn routes() -> Router<AppContext> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/profile", get(get_profile).put(update_profile))
        .route("/auth/account", delete(delete_account))
}

async fn register(
    State(ctx): State<AppContext>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let response = ctx.account_manager.register(json_body(payload)?).await?;
    Ok(ApiResponse::created(response).with_message("Registration successful"))
}

async fn login(
    State(ctx): State<AppContext>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let response = ctx.account_manager.login(json_body(payload)?).await?;
    Ok(ApiResponse::ok(response).with_message("Login successful"))
}

async fn get_profile(
    State(ctx): State<AppContext>,
    auth: AuthContext,
) -> ApiResult<impl IntoResponse> {
    let account = ctx.account_manager.get_account(&auth.account_id).await?;
    Ok(ApiResponse::ok(Profile::from(account)))
}

async fn update_profile(
    State(ctx): State<AppContext>,
    auth: AuthContext,
    payload: Result<Json<UpdateProfileRequest>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let account = ctx
        .account_manager
        .update_profile(&auth.account_id, json_body(payload)?)
        .await?;
    Ok(ApiResponse::ok(Profile::from(account)).with_message("Profile updated"))
}

async fn delete_account(
    State(ctx): State<AppContext>,
    auth: AuthContext,
) -> ApiResult<impl IntoResponse> {
    ctx.account_manager.delete_account(&auth.account_id).await?;
    Ok(ApiResponse::message("Account and all associated data deleted"))
}
