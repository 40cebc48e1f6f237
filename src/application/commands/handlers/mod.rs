//! Command Handlers 实现
//!
//! 所有 CommandHandler 的具体实现

mod voice_handlers;

pub use voice_handlers::*;
