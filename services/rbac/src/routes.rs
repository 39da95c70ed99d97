//! RBAC service routes
//!
//! Single-entity routes address their record with query parameters (`id`, or
//! the composite pair for associations). Request bodies are validated before
//! any store or authenticator call.

use axum::{
    Json, Router,
    extract::{
        Query, State,
        rejection::{JsonRejection, QueryRejection},
    },
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post, put},
};
use serde::{Deserialize, de::DeserializeOwned};
use serde_json::json;
use tracing::info;

use crate::{
    error::{RbacError, RbacResult},
    models::{
        LoginCredentials, NewAccess, NewRole, NewRoleAccess, NewUser, NewUserRole,
        PasswordChange, UpdateUser, UpdateUserRole,
    },
    password::hash_password,
    state::{AppState, Backend},
    store::{CrudStore, RoleAccessStore, UserRoleStore},
    validation::{
        validate_email, validate_mobile, validate_name, validate_password, validate_required,
        validate_username,
    },
};

/// `?id=` on single-entity routes
#[derive(Debug, Deserialize)]
pub struct IdQuery {
    pub id: i32,
}

/// `?user_id=&role_id=` on user role routes
#[derive(Debug, Deserialize)]
pub struct UserRoleQuery {
    pub user_id: i32,
    pub role_id: i32,
}

/// `?role_id=&access_id=` on role access routes
#[derive(Debug, Deserialize)]
pub struct RoleAccessQuery {
    pub role_id: i32,
    pub access_id: i32,
}

/// Body of user create and update; `password` is only read on create
#[derive(Debug, Deserialize)]
pub struct UserRequest {
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub mobile: String,
    #[serde(default)]
    pub password: Option<String>,
}

impl UserRequest {
    fn validate(&self) -> RbacResult<()> {
        validate_username(&self.name)?;
        validate_email(&self.email)?;
        validate_mobile(&self.mobile)?;
        Ok(())
    }
}

/// Body of role and access create and update
#[derive(Debug, Deserialize)]
pub struct NameRequest {
    pub name: String,
}

fn query<T>(query: Result<Query<T>, QueryRejection>) -> RbacResult<T> {
    query.map(|Query(q)| q).map_err(|_| RbacError::InvalidId)
}

fn body<T: DeserializeOwned>(body: Result<Json<T>, JsonRejection>) -> RbacResult<T> {
    body.map(|Json(b)| b)
        .map_err(|rejection| RbacError::Validation(rejection.body_text()))
}

/// Create the router for the RBAC service
pub fn create_router<B: Backend>(state: AppState<B>) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/login", post(login::<B>))
        .route("/users", get(list_users::<B>).post(create_user::<B>))
        .route(
            "/user",
            get(get_user::<B>)
                .put(update_user::<B>)
                .delete(delete_user::<B>),
        )
        .route("/user/password", put(change_password::<B>))
        .route("/user/access", get(user_access::<B>))
        .route("/user/roles", get(user_roles_for_user::<B>))
        .route("/roles", get(list_roles::<B>).post(create_role::<B>))
        .route(
            "/role",
            get(get_role::<B>)
                .put(update_role::<B>)
                .delete(delete_role::<B>),
        )
        .route("/role/access", get(role_access_for_role::<B>))
        .route("/accesses", get(list_accesses::<B>).post(create_access::<B>))
        .route(
            "/access",
            get(get_access::<B>)
                .put(update_access::<B>)
                .delete(delete_access::<B>),
        )
        .route(
            "/user-roles",
            get(list_user_roles::<B>).post(create_user_role::<B>),
        )
        .route(
            "/user-role",
            get(get_user_role::<B>)
                .put(update_user_role::<B>)
                .delete(delete_user_role::<B>),
        )
        .route(
            "/role-accesses",
            get(list_role_accesses::<B>).post(create_role_access::<B>),
        )
        .route(
            "/role-access",
            get(get_role_access::<B>)
                .put(update_role_access::<B>)
                .delete(delete_role_access::<B>),
        )
        .with_state(state)
}

/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "service": "rbac-service"
    }))
}

/// Exchange credentials for a session token
pub async fn login<B: Backend>(
    State(state): State<AppState<B>>,
    payload: Result<Json<LoginCredentials>, JsonRejection>,
) -> RbacResult<impl IntoResponse> {
    let credentials = body(payload)?;
    validate_required("username", &credentials.username)?;
    validate_required("password", &credentials.password)?;

    let token = state
        .authenticator
        .login(&credentials.username, &credentials.password)
        .await?;

    Ok(Json(json!({ "token": token })))
}

// Users

pub async fn list_users<B: Backend>(
    State(state): State<AppState<B>>,
) -> RbacResult<impl IntoResponse> {
    Ok(Json(state.users.get_all().await?))
}

pub async fn create_user<B: Backend>(
    State(state): State<AppState<B>>,
    payload: Result<Json<UserRequest>, JsonRejection>,
) -> RbacResult<impl IntoResponse> {
    let request = body(payload)?;
    request.validate()?;
    let password = request.password.unwrap_or_default();
    validate_password(&password)?;

    let user = state
        .users
        .create(&NewUser {
            username: request.name,
            email: request.email,
            mobile: request.mobile,
            password_hash: hash_password(&password)?,
        })
        .await?;
    info!(user_id = user.id, "Created user");

    Ok((StatusCode::CREATED, Json(user)))
}

pub async fn get_user<B: Backend>(
    State(state): State<AppState<B>>,
    id: Result<Query<IdQuery>, QueryRejection>,
) -> RbacResult<impl IntoResponse> {
    let IdQuery { id } = query(id)?;
    Ok(Json(state.users.get(id).await?))
}

pub async fn update_user<B: Backend>(
    State(state): State<AppState<B>>,
    id: Result<Query<IdQuery>, QueryRejection>,
    payload: Result<Json<UserRequest>, JsonRejection>,
) -> RbacResult<impl IntoResponse> {
    let IdQuery { id } = query(id)?;
    let request = body(payload)?;
    request.validate()?;

    let user = state
        .users
        .update(
            id,
            &UpdateUser {
                username: request.name,
                email: request.email,
                mobile: request.mobile,
            },
        )
        .await?;
    info!(user_id = id, "Updated user");

    Ok(Json(user))
}

pub async fn delete_user<B: Backend>(
    State(state): State<AppState<B>>,
    id: Result<Query<IdQuery>, QueryRejection>,
) -> RbacResult<impl IntoResponse> {
    let IdQuery { id } = query(id)?;
    state.users.delete(id).await?;
    info!(user_id = id, "Deleted user");
    Ok(StatusCode::NO_CONTENT)
}

pub async fn change_password<B: Backend>(
    State(state): State<AppState<B>>,
    id: Result<Query<IdQuery>, QueryRejection>,
    payload: Result<Json<PasswordChange>, JsonRejection>,
) -> RbacResult<impl IntoResponse> {
    let IdQuery { id } = query(id)?;
    let change = body(payload)?;
    validate_required("old_password", &change.old_password)?;
    validate_required("password", &change.password)?;

    state
        .authenticator
        .change_password(id, &change.old_password, &change.password)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

/// Effective accesses of a user
pub async fn user_access<B: Backend>(
    State(state): State<AppState<B>>,
    id: Result<Query<IdQuery>, QueryRejection>,
) -> RbacResult<impl IntoResponse> {
    let IdQuery { id } = query(id)?;
    Ok(Json(state.aggregator.effective_accesses(id).await?))
}

pub async fn user_roles_for_user<B: Backend>(
    State(state): State<AppState<B>>,
    id: Result<Query<IdQuery>, QueryRejection>,
) -> RbacResult<impl IntoResponse> {
    let IdQuery { id } = query(id)?;
    Ok(Json(state.user_roles.roles_for_user(id).await?))
}

// Roles

pub async fn list_roles<B: Backend>(
    State(state): State<AppState<B>>,
) -> RbacResult<impl IntoResponse> {
    Ok(Json(state.roles.get_all().await?))
}

pub async fn create_role<B: Backend>(
    State(state): State<AppState<B>>,
    payload: Result<Json<NameRequest>, JsonRejection>,
) -> RbacResult<impl IntoResponse> {
    let NameRequest { name } = body(payload)?;
    validate_name("role", &name)?;

    let role = state.roles.create(&NewRole { name }).await?;
    info!(role_id = role.id, "Created role");

    Ok((StatusCode::CREATED, Json(role)))
}

pub async fn get_role<B: Backend>(
    State(state): State<AppState<B>>,
    id: Result<Query<IdQuery>, QueryRejection>,
) -> RbacResult<impl IntoResponse> {
    let IdQuery { id } = query(id)?;
    Ok(Json(state.roles.get(id).await?))
}

pub async fn update_role<B: Backend>(
    State(state): State<AppState<B>>,
    id: Result<Query<IdQuery>, QueryRejection>,
    payload: Result<Json<NameRequest>, JsonRejection>,
) -> RbacResult<impl IntoResponse> {
    let IdQuery { id } = query(id)?;
    let NameRequest { name } = body(payload)?;
    validate_name("role", &name)?;

    Ok(Json(state.roles.update(id, &NewRole { name }).await?))
}

pub async fn delete_role<B: Backend>(
    State(state): State<AppState<B>>,
    id: Result<Query<IdQuery>, QueryRejection>,
) -> RbacResult<impl IntoResponse> {
    let IdQuery { id } = query(id)?;
    state.roles.delete(id).await?;
    info!(role_id = id, "Deleted role");
    Ok(StatusCode::NO_CONTENT)
}

pub async fn role_access_for_role<B: Backend>(
    State(state): State<AppState<B>>,
    id: Result<Query<IdQuery>, QueryRejection>,
) -> RbacResult<impl IntoResponse> {
    let IdQuery { id } = query(id)?;
    Ok(Json(state.role_accesses.accesses_for_role(id).await?))
}

// Accesses

pub async fn list_accesses<B: Backend>(
    State(state): State<AppState<B>>,
) -> RbacResult<impl IntoResponse> {
    Ok(Json(state.accesses.get_all().await?))
}

pub async fn create_access<B: Backend>(
    State(state): State<AppState<B>>,
    payload: Result<Json<NameRequest>, JsonRejection>,
) -> RbacResult<impl IntoResponse> {
    let NameRequest { name } = body(payload)?;
    validate_name("access", &name)?;

    let access = state.accesses.create(&NewAccess { name }).await?;
    info!(access_id = access.id, "Created access");

    Ok((StatusCode::CREATED, Json(access)))
}

pub async fn get_access<B: Backend>(
    State(state): State<AppState<B>>,
    id: Result<Query<IdQuery>, QueryRejection>,
) -> RbacResult<impl IntoResponse> {
    let IdQuery { id } = query(id)?;
    Ok(Json(state.accesses.get(id).await?))
}

pub async fn update_access<B: Backend>(
    State(state): State<AppState<B>>,
    id: Result<Query<IdQuery>, QueryRejection>,
    payload: Result<Json<NameRequest>, JsonRejection>,
) -> RbacResult<impl IntoResponse> {
    let IdQuery { id } = query(id)?;
    let NameRequest { name } = body(payload)?;
    validate_name("access", &name)?;

    Ok(Json(state.accesses.update(id, &NewAccess { name }).await?))
}

pub async fn delete_access<B: Backend>(
    State(state): State<AppState<B>>,
    id: Result<Query<IdQuery>, QueryRejection>,
) -> RbacResult<impl IntoResponse> {
    let IdQuery { id } = query(id)?;
    state.accesses.delete(id).await?;
    info!(access_id = id, "Deleted access");
    Ok(StatusCode::NO_CONTENT)
}

// User roles

pub async fn list_user_roles<B: Backend>(
    State(state): State<AppState<B>>,
) -> RbacResult<impl IntoResponse> {
    Ok(Json(state.user_roles.get_all().await?))
}

pub async fn create_user_role<B: Backend>(
    State(state): State<AppState<B>>,
    payload: Result<Json<NewUserRole>, JsonRejection>,
) -> RbacResult<impl IntoResponse> {
    let membership = state.user_roles.create(&body(payload)?).await?;
    info!(
        user_id = membership.user_id,
        role_id = membership.role_id,
        "Assigned role"
    );
    Ok((StatusCode::CREATED, Json(membership)))
}

pub async fn get_user_role<B: Backend>(
    State(state): State<AppState<B>>,
    key: Result<Query<UserRoleQuery>, QueryRejection>,
) -> RbacResult<impl IntoResponse> {
    let UserRoleQuery { user_id, role_id } = query(key)?;
    Ok(Json(state.user_roles.get((user_id, role_id)).await?))
}

pub async fn update_user_role<B: Backend>(
    State(state): State<AppState<B>>,
    key: Result<Query<UserRoleQuery>, QueryRejection>,
    payload: Result<Json<UpdateUserRole>, JsonRejection>,
) -> RbacResult<impl IntoResponse> {
    let UserRoleQuery { user_id, role_id } = query(key)?;
    let changes = body(payload)?;
    Ok(Json(
        state.user_roles.update((user_id, role_id), &changes).await?,
    ))
}

pub async fn delete_user_role<B: Backend>(
    State(state): State<AppState<B>>,
    key: Result<Query<UserRoleQuery>, QueryRejection>,
) -> RbacResult<impl IntoResponse> {
    let UserRoleQuery { user_id, role_id } = query(key)?;
    state.user_roles.delete((user_id, role_id)).await?;
    info!(user_id, role_id, "Revoked role");
    Ok(StatusCode::NO_CONTENT)
}

// Role accesses

pub async fn list_role_accesses<B: Backend>(
    State(state): State<AppState<B>>,
) -> RbacResult<impl IntoResponse> {
    Ok(Json(state.role_accesses.get_all().await?))
}

pub async fn create_role_access<B: Backend>(
    State(state): State<AppState<B>>,
    payload: Result<Json<NewRoleAccess>, JsonRejection>,
) -> RbacResult<impl IntoResponse> {
    let grant = state.role_accesses.create(&body(payload)?).await?;
    info!(
        role_id = grant.role_id,
        access_id = grant.access_id,
        "Granted access"
    );
    Ok((StatusCode::CREATED, Json(grant)))
}

pub async fn get_role_access<B: Backend>(
    State(state): State<AppState<B>>,
    key: Result<Query<RoleAccessQuery>, QueryRejection>,
) -> RbacResult<impl IntoResponse> {
    let RoleAccessQuery { role_id, access_id } = query(key)?;
    Ok(Json(state.role_accesses.get((role_id, access_id)).await?))
}

/// Move a grant onto the role and access named in the body
pub async fn update_role_access<B: Backend>(
    State(state): State<AppState<B>>,
    key: Result<Query<RoleAccessQuery>, QueryRejection>,
    payload: Result<Json<NewRoleAccess>, JsonRejection>,
) -> RbacResult<impl IntoResponse> {
    let RoleAccessQuery { role_id, access_id } = query(key)?;
    let target = body(payload)?;
    Ok(Json(
        state
            .role_accesses
            .update((role_id, access_id), &target)
            .await?,
    ))
}

pub async fn delete_role_access<B: Backend>(
    State(state): State<AppState<B>>,
    key: Result<Query<RoleAccessQuery>, QueryRejection>,
) -> RbacResult<impl IntoResponse> {
    let RoleAccessQuery { role_id, access_id } = query(key)?;
    state.role_accesses.delete((role_id, access_id)).await?;
    info!(role_id, access_id, "Revoked access");
    Ok(StatusCode::NO_CONTENT)
}
