pub mod desk_key;
pub mod metrics;
pub mod request_id;

pub use desk_key::{require_desk_key, DESK_KEY_HEADER};
pub use metrics::metrics_middleware;
pub use request_id::{request_id_middleware, REQUEST_ID_HEADER};
