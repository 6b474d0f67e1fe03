mod cmd;
mod conf;
mod layers;
mod site;
mod watch;

pub mod batch;
pub mod cache;
pub mod contract;
pub mod details;
pub mod editor;
pub mod errors;
pub mod forms;
pub mod listing;
pub mod schema;
pub mod store;
pub mod testing;
pub mod validation;
mod validators;
pub mod value;
pub mod views;

pub use cmd::{ImportCommand, NestedCommand, ServeCommand, SiteCommand};
pub use conf::{LogFormat, SiteConf};
pub use errors::{ApiError, ApiResult};
pub use site::{Site, SiteBuilder, SiteError, init_tracing};
pub use validation::{Validate, ValidationError, ValidationReport};
