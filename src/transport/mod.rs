pub mod authenticating;
pub mod refresh;
pub mod request;
pub mod response;

pub use authenticating::AuthenticatingTransport;
pub use refresh::{RefreshTransport, RefreshedSession};
pub use request::{RequestBody, RequestDescriptor};
pub use response::Response;
