//! WSAA authentication: the daily token/signature cache and the
//! [`Authenticator`] collaborator that performs the signed login.

mod cache;
mod token;

pub use cache::*;
pub use token::*;
