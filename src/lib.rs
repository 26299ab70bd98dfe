pub mod config;
pub mod error;
pub mod extract;
pub mod fetch;
pub mod logging;
pub mod normalize;
pub mod pipeline;
pub mod report_date;
pub mod secrets;
pub mod store;
pub mod warehouse;
