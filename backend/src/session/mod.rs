pub mod middleware;
pub mod store;

pub use middleware::{SessionId, SessionMiddleware, SESSION_HEADER};
pub use store::{SessionContext, SessionStore};
