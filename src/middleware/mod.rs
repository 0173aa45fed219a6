pub mod auth;
pub mod extract;
pub mod response;

pub use auth::{authenticate_jwt, require_admin, require_correct_user_or_admin, AuthUser};
pub use extract::{ValidJson, ValidPath, ValidQuery};
pub use response::{ApiResponse, ApiResult};
