mod request;
mod response;

pub use request::DelineateRequest;
pub use response::{HealthResponse, RootResponse};
