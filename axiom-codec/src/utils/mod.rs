pub mod native;
pub mod reader;
pub mod writer;
