//! Shapes exchanged with the user management API.

mod form;
mod response;
mod role;
mod user;

pub use form::*;
pub use response::*;
pub use role::*;
pub use user::*;
