mod combat_event;
mod decoder;
mod error;
mod parser;
mod reader;

pub use combat_event::*;
pub use decoder::{decode_line, is_end_sentinel};
pub use error::{ParseError, ReaderError};
pub use parser::LogParser;
pub use reader::{CatchUp, ReadOutcome, Reader, decode_bytes};
