pub mod executor;
pub mod pipeline;

pub use executor::{QueryOutput, SqlExecutor};
pub use pipeline::Nl2SqlService;
