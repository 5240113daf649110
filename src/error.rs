use thiserror::Error;

pub type Result<T> = std::result::Result<T, ArmatureError>;

/// Errors raised while assembling an application.
///
/// These are configuration failures: they surface at startup/registration
/// time and are never mapped to an HTTP response.
#[derive(Debug, Error)]
pub enum ArmatureError {
    #[error("no provider registered for `{type_name}`")]
    ProviderNotFound { type_name: String },

    #[error("failed to downcast resolved instance of `{type_name}`")]
    DowncastFailed { type_name: String },

    #[error("circular dependency detected: {cycle}")]
    CircularDependency { cycle: String },

    #[error("`{type_name}` was not declared as a dependency by its provider")]
    UndeclaredDependency { type_name: String },

    #[error("`{type_name}` is not registered as a controller, register it with `provide_controller`")]
    NotAController { type_name: String },

    #[error("invalid controller passed to the controllers list, check the n={position} item: {source}")]
    ControllerResolution {
        position: usize,
        #[source]
        source: Box<ArmatureError>,
    },

    #[error("invalid port: `{value}`")]
    InvalidPort { value: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
