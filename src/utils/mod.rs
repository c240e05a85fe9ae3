//! Process and path helpers shared by the tool wrappers.

pub mod exec;
pub mod path;
