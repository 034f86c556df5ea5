use actix_web::{HttpResponse, web};
use serde::Deserialize;
use utoipa::ToSchema;

use crate::error::AppResult;
use crate::model::{
    DepartmentId, UserId,
    department::{Department, NewDepartment},
    user::{NewUser, User},
};
use crate::policy::Caller;
use crate::state::AppState;

#[derive(Debug, Deserialize, ToSchema)]
pub struct AssignDepartment {
    /// `null` detaches the user from any department.
    #[schema(example = 1, nullable = true)]
    pub department_id: Option<DepartmentId>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct SetManager {
    #[schema(example = 12, nullable = true)]
    pub manager_id: Option<UserId>,
}

#[utoipa::path(
    post,
    path = "/api/admin/users",
    request_body = NewUser,
    responses(
        (status = 201, description = "User created", body = User),
        (status = 400, description = "Invalid profile or department for role"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Department not found")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Admin"
)]
pub async fn create_user(
    caller: Caller,
    state: web::Data<AppState>,
    body: web::Json<NewUser>,
) -> AppResult<HttpResponse> {
    let user = state.admin.create_user(&caller, body.into_inner()).await?;
    Ok(HttpResponse::Created().json(user))
}

#[utoipa::path(
    put,
    path = "/api/admin/users/{id}/department",
    params(("id" = u64, Path, description = "User id")),
    request_body = AssignDepartment,
    responses(
        (status = 200, description = "Department assigned", body = User),
        (status = 400, description = "Department not allowed for the user's role"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "User or department not found")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Admin"
)]
pub async fn assign_department(
    caller: Caller,
    state: web::Data<AppState>,
    path: web::Path<UserId>,
    body: web::Json<AssignDepartment>,
) -> AppResult<HttpResponse> {
    let user = state
        .admin
        .assign_department(&caller, path.into_inner(), body.department_id)
        .await?;
    Ok(HttpResponse::Ok().json(user))
}

#[utoipa::path(
    put,
    path = "/api/admin/users/{id}/deactivate",
    params(("id" = u64, Path, description = "User id")),
    responses(
        (status = 204, description = "User deactivated"),
        (status = 400, description = "Cannot deactivate yourself"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "User not found")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Admin"
)]
pub async fn deactivate_user(
    caller: Caller,
    state: web::Data<AppState>,
    path: web::Path<UserId>,
) -> AppResult<HttpResponse> {
    state.admin.deactivate_user(&caller, path.into_inner()).await?;
    Ok(HttpResponse::NoContent().finish())
}

#[utoipa::path(
    post,
    path = "/api/admin/departments",
    request_body = NewDepartment,
    responses(
        (status = 201, description = "Department created", body = Department),
        (status = 400, description = "Invalid name or manager"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Admin"
)]
pub async fn create_department(
    caller: Caller,
    state: web::Data<AppState>,
    body: web::Json<NewDepartment>,
) -> AppResult<HttpResponse> {
    let department = state
        .admin
        .create_department(&caller, body.into_inner())
        .await?;
    Ok(HttpResponse::Created().json(department))
}

#[utoipa::path(
    put,
    path = "/api/admin/departments/{id}/manager",
    params(("id" = u64, Path, description = "Department id")),
    request_body = SetManager,
    responses(
        (status = 200, description = "Manager set", body = Department),
        (status = 400, description = "Manager must be an active supervisor or administrator"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Department or manager not found")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Admin"
)]
pub async fn set_department_manager(
    caller: Caller,
    state: web::Data<AppState>,
    path: web::Path<DepartmentId>,
    body: web::Json<SetManager>,
) -> AppResult<HttpResponse> {
    let department = state
        .admin
        .set_department_manager(&caller, path.into_inner(), body.manager_id)
        .await?;
    Ok(HttpResponse::Ok().json(department))
}

#[utoipa::path(
    put,
    path = "/api/admin/departments/{id}/deactivate",
    params(("id" = u64, Path, description = "Department id")),
    responses(
        (status = 204, description = "Department deactivated"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Department not found")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Admin"
)]
pub async fn deactivate_department(
    caller: Caller,
    state: web::Data<AppState>,
    path: web::Path<DepartmentId>,
) -> AppResult<HttpResponse> {
    state
        .admin
        .deactivate_department(&caller, path.into_inner())
        .await?;
    Ok(HttpResponse::NoContent().finish())
}
