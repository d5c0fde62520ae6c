use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::modules::authz::model::{AssignRoleDto, GivePermissionDto, Permission, Role};
use crate::modules::users::model::{
    CreateUserDto, MessageResponse, UpdateUserDto, User, UserWithAccess,
};

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::modules::users::controller::get_users,
        crate::modules::users::controller::create_user,
        crate::modules::users::controller::get_user,
        crate::modules::users::controller::update_user,
        crate::modules::users::controller::delete_user,
        crate::modules::authz::controller::assign_role,
        crate::modules::authz::controller::remove_role,
        crate::modules::authz::controller::give_permission,
        crate::modules::authz::controller::revoke_permission,
    ),
    components(
        schemas(
            User,
            UserWithAccess,
            CreateUserDto,
            UpdateUserDto,
            Role,
            Permission,
            AssignRoleDto,
            GivePermissionDto,
            MessageResponse,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Users", description = "User management endpoints"),
        (name = "Access control", description = "Role and permission assignment endpoints")
    ),
    info(
        title = "Warden API",
        version = "0.1.0",
        description = "A user-management REST API built with Rust, Axum, and PostgreSQL featuring role- and permission-based access control.",
        license(
            name = "MIT"
        )
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            )
        }
    }
}
