//! Static analysis passes: [`resolver`] binds names and lays out frames,
//! [`checker`] infers and validates types. Both accumulate errors instead
//! of stopping at the first one.

pub mod checker;
pub mod resolver;
pub mod scope_error;
pub mod type_error;

pub use checker::Checker;
pub use resolver::Resolver;
pub use scope_error::ScopeError;
pub use type_error::TypeError;
