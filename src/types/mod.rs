// Public modules
pub mod approach_type;
pub mod chat_request;
pub mod chat_response;
pub mod citation;
pub mod dialog_request;
pub mod rate_request;
pub mod rating;
pub mod search_settings;

// Re-exports
pub use approach_type::{ApproachType, ApproachTypeParseError};
pub use chat_request::{ChatRequest, ChatRequestOverrides};
pub use chat_response::{Answer, ChatResponse};
pub use citation::{CONTENT_PATH_PREFIX, Citation, citation_file_path};
pub use dialog_request::DialogRequest;
pub use rate_request::{RateRequest, RateResponse};
pub use rating::Rating;
pub use search_settings::SearchSettings;
