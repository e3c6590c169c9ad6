pub mod mention;
pub mod news;
