pub mod accounts;
pub mod consent;
pub mod copy_trades;
pub mod dashboard;
pub mod followers;
pub mod health;
pub mod metrics;
pub mod poll;
pub mod trades;
