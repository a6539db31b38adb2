pub mod config;
pub mod depreciation;
pub mod maintenance;
pub mod models;
pub mod money;
pub mod response;
pub mod state;
pub mod validation;
