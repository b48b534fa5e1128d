pub mod line;
pub mod message;

pub use line::{LineAssembler, decode_line};
pub use message::{InboundMessage, OutboundCommand};
