use crate::modules::authz::controller::{
    assign_role, give_permission, remove_role, revoke_permission,
};
use crate::modules::users::controller::{
    create_user, delete_user, get_user, get_users, update_user,
};
use crate::state::AppState;
use axum::{
    Router,
    routing::{delete, get, post},
};

pub fn init_users_router() -> Router<AppState> {
    Router::new()
        .route("/", get(get_users).post(create_user))
        .route(
            "/{id}",
            get(get_user).put(update_user).delete(delete_user),
        )
        .route("/{id}/assign-role", post(assign_role))
        .route("/{id}/give-permission", post(give_permission))
        .route("/{id}/remove-role/{role}", delete(remove_role))
        .route("/{id}/revoke-permission-to/{permission}", delete(revoke_permission))
}
