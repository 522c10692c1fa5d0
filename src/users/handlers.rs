use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path, State,
    },
    http::header::LOCATION,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use tracing::{info, instrument, warn};

use crate::{
    auth::extractors::AuthUser,
    error::{AppError, AppResult},
    state::AppState,
    users::{
        dto::{CreateUserRequest, DeleteResponse, LoginRequest, TokenResponse, UpdateUserRequest},
        repo_types::{User, UserInfo},
        services::UserService,
    },
};

pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/login", post(login))
        .route("/user", post(create_user).put(update_user))
        .route("/user/:id", get(get_user).delete(delete_user))
}

fn location(id: i64) -> [(axum::http::HeaderName, String); 1] {
    [(LOCATION, format!("/user/{id}"))]
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> AppResult<Json<TokenResponse>> {
    let Json(payload) = payload?;
    payload.validate().map_err(AppError::Validation)?;

    let token = state.users.login(&payload.username, &payload.password).await?;
    Ok(Json(TokenResponse { token }))
}

#[instrument(skip(state, payload))]
pub async fn create_user(
    State(state): State<AppState>,
    payload: Result<Json<CreateUserRequest>, JsonRejection>,
) -> AppResult<impl IntoResponse> {
    let Json(mut payload) = payload?;
    payload.normalize_and_validate().map_err(|e| {
        warn!(error = %e, "invalid create user payload");
        AppError::Validation(e)
    })?;

    let user = User::new(payload.username, payload.email, payload.password);
    let created = state.users.create_user(user).await?;
    Ok((location(created.id()), Json(UserInfo::from(created))))
}

#[instrument(skip(state))]
pub async fn get_user(
    State(state): State<AppState>,
    AuthUser(_caller): AuthUser,
    id: Result<Path<i64>, PathRejection>,
) -> AppResult<Json<UserInfo>> {
    let Path(id) = id?;
    let user = state.users.get_user_by_id(id).await?;
    Ok(Json(user.into()))
}

/// Changes the caller's own password; any id in the body is ignored.
#[instrument(skip(state, payload))]
pub async fn update_user(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    payload: Result<Json<UpdateUserRequest>, JsonRejection>,
) -> AppResult<impl IntoResponse> {
    let Json(payload) = payload?;
    payload.validate().map_err(AppError::Validation)?;

    let mut user = User::new(String::new(), String::new(), payload.password);
    UserService::prepare(&mut user);
    user.info.id = user_id;

    let updated = state.users.update_user(user).await?;
    Ok((location(updated.id()), Json(UserInfo::from(updated))))
}

#[instrument(skip(state))]
pub async fn delete_user(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    id: Result<Path<i64>, PathRejection>,
) -> AppResult<Json<DeleteResponse>> {
    let Path(id) = id?;
    if caller != id {
        warn!(caller, target_id = id, "refusing to delete another user");
        return Err(AppError::Unauthorized("can only delete your own account".into()));
    }

    let status = state.users.delete_user(id).await?;
    info!(user_id = id, rows = status, "user deleted");
    Ok(Json(DeleteResponse { status }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        http::{header::AUTHORIZATION, header::CONTENT_TYPE, Method, Request, StatusCode},
        response::Response,
    };
    use serde_json::{json, Value};
    use tower::ServiceExt;

    async fn seeded() -> (AppState, Router) {
        let state = AppState::fake();
        for (name, password) in [("user1", "user1-password"), ("user2", "user2-password")] {
            state
                .users
                .create_user(User::new(name, format!("{name}@gmail.com"), password))
                .await
                .unwrap();
        }
        let app = crate::app::build_app(state.clone());
        (state, app)
    }

    async fn send(
        app: &Router,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> Response {
        let mut req = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            req = req.header(AUTHORIZATION, format!("Bearer {token}"));
        }
        let body = match body {
            Some(v) => {
                req = req.header(CONTENT_TYPE, "application/json");
                Body::from(v.to_string())
            }
            None => Body::empty(),
        };
        app.clone().oneshot(req.body(body).unwrap()).await.unwrap()
    }

    async fn body_json(response: Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    async fn login_as(app: &Router, username: &str, password: &str) -> String {
        let res = send(
            app,
            Method::POST,
            "/login",
            None,
            Some(json!({ "username": username, "password": password })),
        )
        .await;
        assert_eq!(res.status(), StatusCode::OK);
        body_json(res).await["token"].as_str().unwrap().to_string()
    }

    #[tokio::test]
    async fn login_then_read_own_profile() {
        let (_, app) = seeded().await;
        let token = login_as(&app, "user1", "user1-password").await;
        assert!(!token.is_empty());

        let res = send(&app, Method::GET, "/user/1", Some(&token), None).await;
        assert_eq!(res.status(), StatusCode::OK);
        let json = body_json(res).await;
        assert_eq!(json["id"], 1);
        assert_eq!(json["username"], "user1");
        assert_eq!(json["email"], "user1@gmail.com");
        assert!(json["created_at"].is_string());
        assert!(json.get("password").is_none());
    }

    #[tokio::test]
    async fn token_in_query_parameter_is_accepted() {
        let (_, app) = seeded().await;
        let token = login_as(&app, "user2", "user2-password").await;
        let res = send(&app, Method::GET, &format!("/user/2?token={token}"), None, None).await;
        assert_eq!(res.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn wrong_password_gets_no_token() {
        let (_, app) = seeded().await;
        let res = send(
            &app,
            Method::POST,
            "/login",
            None,
            Some(json!({ "username": "user1", "password": "wrong-password" })),
        )
        .await;
        assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let json = body_json(res).await;
        assert!(json.get("token").is_none());
        assert!(json["error"].is_string());
    }

    #[tokio::test]
    async fn protected_routes_need_a_valid_token() {
        let (_, app) = seeded().await;
        let res = send(&app, Method::GET, "/user/1", None, None).await;
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

        let res = send(&app, Method::GET, "/user/1", Some("not.a.token"), None).await;
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

        let foreign = crate::auth::jwt::JwtKeys::new(&crate::config::JwtConfig {
            secret: "some-other-secret".into(),
            ttl_minutes: 60,
        })
        .issue(1)
        .unwrap();
        let res = send(&app, Method::GET, "/user/1", Some(&foreign), None).await;
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn missing_user_and_bad_id() {
        let (_, app) = seeded().await;
        let token = login_as(&app, "user1", "user1-password").await;

        let res = send(&app, Method::GET, "/user/999", Some(&token), None).await;
        assert_eq!(res.status(), StatusCode::NOT_FOUND);

        let res = send(&app, Method::GET, "/user/abc", Some(&token), None).await;
        assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn create_user_returns_public_info_and_location() {
        let (_, app) = seeded().await;
        let res = send(
            &app,
            Method::POST,
            "/user",
            None,
            Some(json!({ "username": "user3", "email": "user3@gmail.com", "password": "user3-password" })),
        )
        .await;
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(res.headers()[LOCATION], "/user/3");
        let json = body_json(res).await;
        assert_eq!(json["id"], 3);
        assert!(json.get("password").is_none());

        login_as(&app, "user3", "user3-password").await;
    }

    #[tokio::test]
    async fn create_user_rejects_bad_input_and_duplicates() {
        let (_, app) = seeded().await;

        let res = send(
            &app,
            Method::POST,
            "/user",
            None,
            Some(json!({ "username": "u", "email": "nope", "password": "x" })),
        )
        .await;
        assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);

        let res = send(&app, Method::POST, "/user", None, Some(json!({ "username": "user9" }))).await;
        assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);

        let res = send(
            &app,
            Method::POST,
            "/user",
            None,
            Some(json!({ "username": "user1", "email": "fresh@gmail.com", "password": "password-1" })),
        )
        .await;
        assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn update_changes_the_callers_password_only() {
        let (state, app) = seeded().await;
        let token = login_as(&app, "user1", "user1-password").await;

        let res = send(
            &app,
            Method::PUT,
            "/user",
            Some(&token),
            Some(json!({ "password": "brand-new-password", "id": 2 })),
        )
        .await;
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(res.headers()[LOCATION], "/user/1");
        let json = body_json(res).await;
        assert_eq!(json["id"], 1);
        assert_eq!(json["username"], "user1");
        assert!(json.get("password").is_none());

        login_as(&app, "user1", "brand-new-password").await;
        login_as(&app, "user2", "user2-password").await;
        assert!(state.users.login("user1", "user1-password").await.is_err());

        let res = send(&app, Method::PUT, "/user", Some(&token), Some(json!({ "password": "short" }))).await;
        assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);

        let res = send(&app, Method::PUT, "/user", None, Some(json!({ "password": "long-enough" }))).await;
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn delete_is_self_only() {
        let (state, app) = seeded().await;
        let token = login_as(&app, "user1", "user1-password").await;

        let res = send(&app, Method::DELETE, "/user/2", Some(&token), None).await;
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
        assert!(state.users.get_user_by_id(2).await.is_ok());

        let res = send(&app, Method::DELETE, "/user/1", Some(&token), None).await;
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(body_json(res).await["status"], 1);
        assert!(state.users.get_user_by_id(1).await.is_err());

        // The token outlives the account; deleting again affects nothing.
        let res = send(&app, Method::DELETE, "/user/1", Some(&token), None).await;
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(body_json(res).await["status"], 0);
    }
}
