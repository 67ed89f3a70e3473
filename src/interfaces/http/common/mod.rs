//! Shared HTTP building blocks: response envelope, error mapping and the
//! validating JSON extractor.

pub mod error;
pub mod response;
pub mod validated_json;

pub use error::{ApiError, ApiResult};
pub use response::ApiResponse;
pub use validated_json::ValidatedJson;
