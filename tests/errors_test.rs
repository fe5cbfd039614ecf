#[cfg(test)]
mod error_tests {
    use eyecapture::errors::CaptureError;
    use eyecapture::store::StoreError;
    use eyecapture::types::ImageHandle;
    use std::error::Error;

    #[test]
    fn test_capture_error_display() {
        let error = CaptureError::FocusFailed("no lock".to_string());
        assert_eq!(format!("{}", error), "Focus failed: no lock");

        let error = CaptureError::ConfigError("bad viewport".to_string());
        assert!(error.to_string().contains("Configuration error"));
        assert!(error.to_string().contains("bad viewport"));
    }

    #[test]
    fn test_capture_error_implements_error_trait() {
        let error = CaptureError::InitializationError("no camera".to_string());
        let _error_trait: &dyn Error = &error;
        assert!(error.source().is_none());
    }

    #[test]
    fn test_store_error_converts_to_storage_error() {
        let error: CaptureError = StoreError::NotFound(ImageHandle::new("P_Left_3.jpg")).into();
        match error {
            CaptureError::StorageError(msg) => assert!(msg.contains("P_Left_3.jpg")),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_store_error_keeps_source() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only");
        let error = StoreError::Remove {
            handle: ImageHandle::new("x.jpg"),
            source: io,
        };
        assert!(error.source().is_some());
        assert!(error.to_string().starts_with("failed to remove x.jpg"));
    }

    #[test]
    fn test_all_error_variants() {
        let errors = vec![
            CaptureError::InitializationError("a".to_string()),
            CaptureError::CameraCommandFailed("b".to_string()),
            CaptureError::FocusFailed("c".to_string()),
            CaptureError::StorageError("d".to_string()),
            CaptureError::ConfigError("e".to_string()),
            CaptureError::SessionClosed,
        ];
        for error in &errors {
            assert!(!error.to_string().is_empty());
            assert_eq!(error.clone(), *error);
        }
    }
}
