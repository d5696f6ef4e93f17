mod app;
mod middleware;
mod state;

pub use app::{create_admin_app, create_app};
pub use middleware::handle_panic;
pub use state::AppState;
