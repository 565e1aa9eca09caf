pub mod albion;
pub mod catalog;
