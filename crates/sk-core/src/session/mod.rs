//! Session management module
//!
//! Request contexts, flash messages and the manager that ties the store and
//! codec together.

mod manager;
mod types;

pub use manager::{FLASH_KEY, SessionManager};
pub use types::{FlashMessage, SessionContext, SessionId};
