pub mod config;
pub mod contacts;
pub mod dashboard;
pub mod db;
pub mod errors;
pub mod events;
pub mod goals;
pub mod kpi;
pub mod logging;
pub mod models;
pub mod objections;
pub mod sequences;
pub mod week;

pub use crate::dashboard::DashboardCore;
pub use crate::errors::{AppError, AppResult};
pub use crate::kpi::KpiStore;
pub use crate::objections::rank_objections;
pub use crate::week::{aggregate_week, week_start};
