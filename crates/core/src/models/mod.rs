pub mod alert;
pub mod analytics;
pub mod distribution;
pub mod lot;
pub mod portfolio;
pub mod settings;
pub mod snapshot;
pub mod timeline;
pub mod transaction;
