pub mod client;
pub mod method;
pub mod request;
pub mod response;

pub use client::{Executor, HttpRemote, Remote};
pub use method::HttpMethod;
pub use request::{RequestBody, RequestSpec, RequestSpecBuilder};
pub use response::{CallResult, Failure, FailureKind, RawResponse, ResponseBody};
