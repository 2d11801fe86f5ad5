pub mod api;
pub mod auth;
pub mod common;
pub mod middleware;

pub use api::ApiRouter;
pub use auth::AuthRouter;
pub use common::{common_routes, COMMON_PATHS};
pub use middleware::{router_name, security_headers, ROUTER_HEADER};
