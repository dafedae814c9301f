pub mod dialog;
pub mod help;
pub mod listing;
pub mod preview;
pub mod status_bar;
