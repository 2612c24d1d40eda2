pub mod auth;
pub mod response;

pub use auth::{bearer_token, require_auth};
pub use response::{ApiResponse, ApiResult};
