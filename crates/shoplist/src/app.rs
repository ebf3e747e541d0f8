use std::time::Duration;

use axum::{
    http::{header, Method, StatusCode},
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::{
    handlers::{
        blobs::get_blob,
        categories::{
            create_category, delete_category, get_category, list_categories, update_category,
        },
        health::livez,
        items::{
            create_index, create_item, delete_item, get_item, list_items, search_items,
            update_item,
        },
        shopping_lists::{
            create_shopping_list, delete_shopping_list, get_shopping_list, list_shopping_lists,
            update_shopping_list,
        },
        users::{delete_user, login, register, upload_image, user_shopping_lists},
    },
    state::AppState,
};

/// Create the application router with all routes and middleware.
pub fn create_app(state: AppState) -> Router {
    // CORS configuration for API endpoints
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]);

    // API routes with CORS
    let api_routes = Router::new()
        // Item routes
        .route("/items", get(list_items).post(create_item))
        .route("/items/search", get(search_items))
        .route("/items/create-index", post(create_index))
        .route(
            "/items/{id}",
            get(get_item).put(update_item).delete(delete_item),
        )
        // Category routes
        .route(
            "/item-categories",
            get(list_categories).post(create_category),
        )
        .route(
            "/item-categories/{id}",
            get(get_category)
                .put(update_category)
                .delete(delete_category),
        )
        // Shopping list routes
        .route(
            "/shopping-lists",
            get(list_shopping_lists).post(create_shopping_list),
        )
        .route(
            "/shopping-lists/{id}",
            get(get_shopping_list)
                .put(update_shopping_list)
                .delete(delete_shopping_list),
        )
        // User routes
        .route("/users/register", post(register))
        .route("/users/login", post(login))
        .route("/users/{id}", axum::routing::delete(delete_user))
        .route("/users/{id}/image", post(upload_image))
        .route("/users/{id}/shopping-lists", get(user_shopping_lists))
        .layer(cors);

    // Main application router
    Router::new()
        .route("/livez", get(livez))
        .route("/blobs/{name}", get(get_blob))
        .nest("/api", api_routes)
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            Duration::from_secs(10),
        ))
        .with_state(state)
}
