//! Live market prices and crafting costs for a single Albion Online item.

pub mod app;
pub mod domain;
pub mod infra;
pub mod scheduler;
pub mod util;
