//! WSFE authorization: wire request/response shapes, the transport and
//! reference collaborators, and the batch authorizer state machine.

mod authorizer;
mod request;
mod response;
mod transport;

pub use authorizer::*;
pub use request::*;
pub use response::*;
pub use transport::*;
