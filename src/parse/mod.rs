pub mod state_parser;
pub mod state_serializer;
pub mod xml;

pub use state_parser::{load_tasks, parse_settings, parse_state};
pub use state_serializer::serialize_state;
pub use xml::{Element, ParseError, parse_document, write_document};
