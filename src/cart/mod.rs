pub mod error;
pub mod handlers;
pub mod locks;
pub mod models;
pub mod oracle;
pub mod pricing;
pub mod service;
pub mod store;

#[cfg(test)]
pub mod testing;

pub use error::*;
pub use handlers::*;
pub use models::*;
pub use oracle::*;
pub use pricing::*;
pub use service::*;
pub use store::*;
