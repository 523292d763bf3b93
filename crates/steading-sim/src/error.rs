//! Error types for the simulation models.
//!
//! All model operations that can fail return typed errors rather than
//! panicking. The only failure mode of the pure models is arithmetic
//! overflow in a [`rust_decimal`] or integer computation.

/// Errors that can occur inside a simulation model.
#[derive(Debug, thiserror::Error)]
pub enum SimError {
    /// An arithmetic overflow occurred during a model computation.
    #[error("arithmetic overflow in simulation computation: {context}")]
    ArithmeticOverflow {
        /// Description of what was being computed.
        context: String,
    },

    /// A model was invoked with an invalid tunable (e.g. a zero tick rate).
    #[error("invalid simulation parameter: {reason}")]
    InvalidParameter {
        /// Explanation of what is wrong with the parameter.
        reason: String,
    },
}

impl SimError {
    /// Shorthand for an overflow error with a static context description.
    pub fn overflow(context: &str) -> Self {
        Self::ArithmeticOverflow {
            context: String::from(context),
        }
    }
}
