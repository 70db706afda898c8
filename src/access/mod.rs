//! Role-based access control for the API.
//!
//! A caller presents a bearer token, the token is mapped to the role it was
//! issued for, and the role is resolved to a set of capabilities through the
//! [RolePolicy] held in the app state.

mod caller;
mod policy;
mod token;

pub use caller::{AccessControl, Caller, Editor, Viewer};
pub use policy::{Capabilities, RolePolicy};
pub use token::ApiTokens;
