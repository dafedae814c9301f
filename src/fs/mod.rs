pub mod listing;
pub mod operations;
pub mod walk;
