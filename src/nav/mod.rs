pub mod cursor;
pub mod history;
