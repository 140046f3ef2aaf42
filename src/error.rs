use thiserror::Error;

/// Errors surfaced by the inspector bridge and the store it observes.
#[derive(Debug, Error)]
pub enum InspectorError {
    #[error("Missing module \"{segment}\" for path \"{path}\".")]
    ModuleNotFound { segment: String, path: String },

    #[error("unknown mutation type: {0}")]
    UnknownMutation(String),

    #[error("unknown action type: {0}")]
    UnknownAction(String),

    #[error("cannot edit state at \"{path}\": {reason}")]
    InvalidEditPath { path: String, reason: String },

    #[error("state written outside of a commit")]
    OutsideCommit,

    #[error("action \"{action}\" failed: {message}")]
    ActionFailed { action: String, message: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Config(#[from] toml::de::Error),
}

pub type Result<T> = std::result::Result<T, InspectorError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_module_not_found_message() {
        let err = InspectorError::ModuleNotFound {
            segment: "cart".into(),
            path: "shop/cart/".into(),
        };
        assert_eq!(
            err.to_string(),
            "Missing module \"cart\" for path \"shop/cart/\"."
        );
    }

    #[test]
    fn test_json_error_converts() {
        let parse: std::result::Result<serde_json::Value, _> = serde_json::from_str("{");
        let err: InspectorError = parse.unwrap_err().into();
        assert!(matches!(err, InspectorError::Json(_)));
    }
}
