pub mod scheduler;
pub mod stock_alerts;
