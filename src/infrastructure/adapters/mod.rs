//! Infrastructure Adapters
//!
//! 六边形架构的适配器实现

pub mod decoder;
pub mod transport;
pub mod tts;

pub use decoder::*;
pub use transport::*;
pub use tts::*;
