//! 클라이언트-서버 프로토콜

mod messages;
mod types;

pub use messages::*;
pub use types::*;
