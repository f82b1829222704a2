pub mod range;
pub mod report;
pub mod target;
