use actix_web::http;
use actix_web::HttpResponse;

/// Errors surfaced by the shared config/metrics plumbing, and by the
/// status HTTP service built on top of it.
#[derive(Debug, thiserror::Error)]
pub enum CommonsError {
    /// A config file failed to parse as TOML.
    #[error("failed to parse config file: {0}")]
    BadConfigFile(String),

    /// The Prometheus registry rejected a metric registration, usually due
    /// to a name collision.
    #[error("failed to register metric: {0}")]
    MetricRegistration(String),

    /// Text-encoding the registry's collected metrics failed.
    #[error("failed to encode metrics: {0}")]
    MetricEncoding(String),
}

impl actix_web::error::ResponseError for CommonsError {
    fn error_response(&self) -> HttpResponse {
        self.as_json_error()
    }

    fn status_code(&self) -> http::StatusCode {
        self.as_status_code()
    }
}

impl CommonsError {
    /// Render this error as the JSON body the status service returns.
    pub fn as_json_error(&self) -> HttpResponse {
        HttpResponse::build(self.as_status_code()).json(serde_json::json!({
            "kind": self.as_kind(),
            "value": self.to_string(),
        }))
    }

    fn as_status_code(&self) -> http::StatusCode {
        match self {
            CommonsError::BadConfigFile(_) => http::StatusCode::INTERNAL_SERVER_ERROR,
            CommonsError::MetricRegistration(_) => http::StatusCode::INTERNAL_SERVER_ERROR,
            CommonsError::MetricEncoding(_) => http::StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn as_kind(&self) -> &'static str {
        match self {
            CommonsError::BadConfigFile(_) => "bad_config_file",
            CommonsError::MetricRegistration(_) => "metric_registration",
            CommonsError::MetricEncoding(_) => "metric_encoding",
        }
    }
}
