pub mod auth;
pub mod response;

pub use auth::{admin_auth_middleware, jwt_auth_middleware, AuthUser};
pub use response::{ApiResponse, ApiResult};
