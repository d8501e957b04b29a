pub mod request_id;
pub mod timeout;

pub use request_id::{request_id_middleware, RequestId, REQUEST_ID_HEADER};
pub use timeout::request_timeout;
