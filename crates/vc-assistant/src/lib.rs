pub mod api;
pub mod clock;
pub mod config;
pub mod driver;
pub mod errors;
pub mod evaluator;
pub mod models;
pub mod polling;
pub mod prompt_template;
pub mod provisioner;
pub mod session;
pub mod store;
pub mod tools;
pub mod uploader;
