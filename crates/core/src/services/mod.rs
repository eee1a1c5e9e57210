pub mod allocation_service;
pub mod analytics_service;
pub mod distribution_service;
pub mod fee_service;
pub mod ledger_service;
pub mod timeline_service;
