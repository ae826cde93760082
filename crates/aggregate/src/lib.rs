pub mod report;
pub mod summary;
pub mod warehouse;

pub use report::{safe_name, EntityReport, TIMESTAMP_FORMAT};
pub use summary::{rank, EntityMeta, EntitySummary, RunTotals};
pub use warehouse::{load_rows, DashboardView, WarehouseRow, WarehouseStats};
