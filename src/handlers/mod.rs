//! Request handlers module

pub mod auth;
pub mod organization;
pub mod regulation;

mod common;
