//! The signed-in user's own account details.

pub mod handlers;
