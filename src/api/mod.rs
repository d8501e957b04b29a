mod extract;
pub mod handlers;
pub mod routes;
pub mod state;

pub use routes::{build_app, create_router};
pub use state::AppState;
