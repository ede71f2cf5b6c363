pub mod canteen_parser;

pub use canteen_parser::{normalize_name, CanteenParser, Parser};
