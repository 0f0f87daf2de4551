pub mod diagnostic_report;
pub mod message;
