//! Demo CRUD application served behind the middleware.

pub mod handlers;
pub mod models;
pub mod routes;
pub mod store;

use std::sync::Arc;

use crate::http::middleware::MiddlewareState;

pub use models::{NewUser, User};
pub use routes::routes;
pub use store::{StoreError, UserStore};

#[derive(Clone)]
pub struct AppState {
    pub store: UserStore,
    pub middleware: MiddlewareState,
}

impl AppState {
    pub fn new(middleware: MiddlewareState) -> Self {
        Self {
            store: UserStore::new(Arc::clone(middleware.emitter())),
            middleware,
        }
    }
}
