pub mod error;
pub mod resolver;
pub mod rpc;
pub mod scalar;
pub mod types;

#[cfg(test)]
mod test_util;

pub use error::{CoreError, NotFound};
pub use resolver::Resolver;
