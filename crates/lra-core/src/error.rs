#[derive(thiserror::Error, Debug)]
pub enum AppError {
    #[error("Spec file '{0}' not found")]
    SpecNotFound(String),

    #[error("Prompt '{0}' not found")]
    PromptNotFound(String),

    #[error("Backend command '{0}' is not installed")]
    BackendNotInstalled(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_spec_not_found() {
        let err = AppError::SpecNotFound("shop_spec.txt".into());
        assert_eq!(err.to_string(), "Spec file 'shop_spec.txt' not found");
    }

    #[test]
    fn test_display_prompt_not_found() {
        let err = AppError::PromptNotFound("coding_prompt".into());
        assert_eq!(err.to_string(), "Prompt 'coding_prompt' not found");
    }

    #[test]
    fn test_display_backend_not_installed() {
        let err = AppError::BackendNotInstalled("claude".into());
        assert_eq!(err.to_string(), "Backend command 'claude' is not installed");
    }

    #[test]
    fn test_error_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<AppError>();
    }
}
