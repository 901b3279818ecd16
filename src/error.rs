//! Configuration errors raised while building an integration.

use thiserror::Error;

/// Errors raised synchronously when an integration is constructed.
///
/// None of these are ever produced on the request path.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// No client type or instance was given to the builder.
    #[error("SupabaseClient class constructor is required")]
    MissingClient,

    /// The options value was not a key-value mapping.
    #[error("SupabaseIntegration options should be an object")]
    NotAnObject,

    /// The options contained a key that is not recognized.
    #[error("Unknown option: {0}")]
    UnknownOption(String),

    /// `operations` was not a list.
    #[error("operations should be an array")]
    OperationsNotArray,

    /// `operations` named something outside the fixed operation set.
    #[error("Unknown operation: {0}")]
    UnknownOperation(String),

    /// A toggle option had the wrong type.
    #[error("{key} should be {expected}")]
    InvalidOptionType {
        /// The offending option key
        key: String,
        /// Human readable description of the accepted type
        expected: &'static str,
    },

    /// A hook option was given a value that is not a function.
    #[error("{key} should be a function that returns {returns}")]
    HookNotFunction {
        /// The offending option key
        key: String,
        /// What the hook is expected to return
        returns: &'static str,
    },
}
