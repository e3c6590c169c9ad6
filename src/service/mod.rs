pub mod command;
pub mod news;
