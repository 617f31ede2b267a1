pub mod analyses;
pub mod chat;
pub mod health;
pub mod metrics;
pub mod reports;
pub mod uploads;
