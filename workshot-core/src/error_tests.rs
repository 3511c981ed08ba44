/*!
Tests for error handling and error types.
*/

#[cfg(test)]
mod tests {
    use crate::error::WorkshotError;
    use std::error::Error as _;
    use std::io;

    #[test]
    fn test_workshot_error_display() {
        let error = WorkshotError::validation("test validation error");
        assert_eq!(error.to_string(), "Validation error: test validation error");

        let error = WorkshotError::storage("test storage error");
        assert_eq!(error.to_string(), "Storage error: test storage error");

        let error = WorkshotError::NotFound("my-work".to_string());
        assert_eq!(error.to_string(), "workshot 'my-work' not found");
    }

    #[test]
    fn test_workshot_error_from_io_error() {
        let io_error = io::Error::new(io::ErrorKind::PermissionDenied, "Access denied");
        let error = WorkshotError::from(io_error);

        match error {
            WorkshotError::Io(_) => {}
            _ => panic!("Expected Io error variant"),
        }
    }

    #[test]
    fn test_workshot_error_from_json_error() {
        let json_error = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let error = WorkshotError::from(json_error);

        match error {
            WorkshotError::Json(_) => {}
            _ => panic!("Expected Json error variant"),
        }
    }

    #[test]
    fn test_schema_mismatch_error() {
        let error = WorkshotError::SchemaMismatch {
            found: 2,
            expected: 1,
        };
        assert_eq!(
            error.to_string(),
            "schema version mismatch: got 2, expected 1"
        );
    }

    #[test]
    fn test_plugin_error_keeps_source() {
        let error = WorkshotError::plugin("git", WorkshotError::invalid_format("expected object"));

        assert_eq!(error.to_string(), "git: invalid data format: expected object");
        let source = error.source().expect("plugin errors carry a source");
        assert!(source.to_string().contains("expected object"));
    }

    #[test]
    fn test_all_capturers_failed_lists_every_error() {
        let error = WorkshotError::AllCapturersFailed(vec![
            WorkshotError::plugin("git", WorkshotError::storage("boom")),
            WorkshotError::plugin("terminal", WorkshotError::storage("bang")),
        ]);

        let message = error.to_string();
        assert!(message.starts_with("all capture plugins failed"));
        assert!(message.contains("git: Storage error: boom"));
        assert!(message.contains("terminal: Storage error: bang"));
    }

    #[test]
    fn test_checkout_error_mentions_branch_and_output() {
        let error = WorkshotError::Checkout {
            branch: "feature/login".to_string(),
            output: "error: Your local changes would be overwritten".to_string(),
        };

        let message = error.to_string();
        assert!(message.contains("feature/login"));
        assert!(message.contains("local changes would be overwritten"));
    }

    #[test]
    fn test_change_directory_error() {
        let error = WorkshotError::ChangeDirectory {
            path: std::path::PathBuf::from("/gone"),
            source: io::Error::new(io::ErrorKind::NotFound, "No such file or directory"),
        };

        assert_eq!(
            error.to_string(),
            "failed to change directory to '/gone': No such file or directory"
        );
        assert!(error.source().is_some());
    }

    #[test]
    fn test_is_not_found() {
        assert!(WorkshotError::NotFound("x".to_string()).is_not_found());
        assert!(!WorkshotError::storage("x").is_not_found());
    }

    #[test]
    fn test_error_is_send_and_sync() {
        fn assert_send<T: Send>() {}
        fn assert_sync<T: Sync>() {}

        assert_send::<WorkshotError>();
        assert_sync::<WorkshotError>();
    }
}
