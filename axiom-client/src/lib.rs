pub use axiom_codec;

pub mod admission;
/// Fluent constructors for every subquery type
pub mod builder;
pub mod config;
pub mod error;
/// Query payment
pub mod fee;
/// [resolver::ChainDataResolver] over JSON-RPC
pub mod providers;
pub mod query;
pub mod resolver;
pub mod subquery;

#[cfg(test)]
mod tests;

pub use config::AxiomV2QueryConfig;
pub use error::{AdmissionError, FeeError, QueryError, ResolverError, SubqueryError};
pub use query::{AxiomV2QueryBuilder, BuiltQuery, QueryOptions, QueryState, ValidationReport};
pub use resolver::ChainDataResolver;
pub use subquery::DataSubquery;
