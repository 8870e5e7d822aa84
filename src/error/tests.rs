//! Unit tests for error handling

use super::*;
use std::io;

#[cfg(test)]
mod data_error_tests {
    use super::*;

    #[tokio::test]
    async fn test_http_error_conversion() {
        let client = reqwest::Client::new();
        let result = client
            .get("http://invalid-url-that-does-not-exist.fake")
            .send()
            .await;
        let reqwest_error = result.unwrap_err();
        let data_error = DataError::from(reqwest_error);

        match data_error {
            DataError::Http(_) => (),
            _ => panic!("Expected Http error variant"),
        }
    }

    #[test]
    fn test_json_error_conversion() {
        let json_error = serde_json::from_str::<serde_json::Value>("invalid json").unwrap_err();
        let data_error = DataError::from(json_error);

        match data_error {
            DataError::Json(_) => (),
            _ => panic!("Expected Json error variant"),
        }
    }

    #[test]
    fn test_io_error_conversion() {
        let io_error = io::Error::new(io::ErrorKind::NotFound, "File not found");
        let data_error = DataError::from(io_error);

        match data_error {
            DataError::Io(_) => (),
            _ => panic!("Expected Io error variant"),
        }
    }

    #[test]
    fn test_invalid_header_error_conversion() {
        let header_error = reqwest::header::HeaderValue::from_str("invalid\nheader").unwrap_err();
        let data_error = DataError::from(header_error);

        match data_error {
            DataError::InvalidHeader(_) => (),
            _ => panic!("Expected InvalidHeader error variant"),
        }
    }

    #[test]
    fn test_parse_int_error_conversion() {
        let parse_error = "twenty".parse::<u16>().unwrap_err();
        let data_error = DataError::from(parse_error);

        match data_error {
            DataError::InvalidNumber(_) => (),
            _ => panic!("Expected InvalidNumber error variant"),
        }
    }

    #[test]
    fn test_missing_field_error() {
        let error = DataError::missing_field("standings", "Gm#");
        let error_string = error.to_string();
        assert!(error_string.contains("standings"));
        assert!(error_string.contains("Gm#"));
    }

    #[test]
    fn test_no_data_error() {
        let error = DataError::no_data("MLB standings API");
        assert_eq!(error.to_string(), "MLB standings API returned no data");
    }

    #[test]
    fn test_store_error() {
        let error = DataError::Store {
            key: "dodgers/data/standings/x.json".to_string(),
            message: "403 Forbidden".to_string(),
        };

        let error_string = error.to_string();
        assert!(error_string.contains("dodgers/data/standings/x.json"));
        assert!(error_string.contains("403 Forbidden"));
    }

    #[test]
    fn test_missing_env_error() {
        let error = DataError::MissingEnv {
            var: "DODGERS_SOCIAL_WEBHOOK".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "Environment variable DODGERS_SOCIAL_WEBHOOK is not set"
        );
    }

    #[test]
    fn test_error_source_chain() {
        use std::error::Error;

        let io_error = io::Error::new(io::ErrorKind::NotFound, "File not found");
        let data_error = DataError::from(io_error);
        assert!(data_error.source().is_some());
    }

    #[test]
    fn test_ledger_error_keeps_context() {
        let err = anyhow::anyhow!("disk full").context("opening run ledger");
        let data_error = DataError::from(err);
        assert_eq!(
            data_error.to_string(),
            "Run ledger error: opening run ledger: disk full"
        );
    }
}
