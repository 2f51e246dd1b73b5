pub mod catalog;
pub mod preview;
pub mod request;
pub mod roster;
pub mod splitter;
pub mod spreadsheet;
