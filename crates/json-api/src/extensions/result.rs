//! Turning service failures into responses or fallbacks.

use std::fmt::Display;

use salvo::prelude::StatusError;
use tracing::{error, warn};

pub(crate) trait ResultExt<T> {
    /// Logs the error and answers 500. The error text never reaches the client.
    fn or_500(self, context: &'static str) -> Result<T, StatusError>;

    /// Logs the error as a warning and carries on with `fallback`.
    fn or_warn(self, context: &'static str, fallback: T) -> T;
}

impl<T, E> ResultExt<T> for Result<T, E>
where
    E: Display,
{
    fn or_500(self, context: &'static str) -> Result<T, StatusError> {
        self.map_err(|source| {
            error!(error = %source, "{context}");

            StatusError::internal_server_error()
        })
    }

    fn or_warn(self, context: &'static str, fallback: T) -> T {
        self.unwrap_or_else(|source| {
            warn!(error = %source, "{context}");

            fallback
        })
    }
}

#[cfg(test)]
mod tests {
    use salvo::http::StatusCode;

    use super::ResultExt as _;

    #[test]
    fn errors_become_internal_server_errors() {
        let result: Result<(), &str> = Err("pool closed");

        let status = result.or_500("loading cart").err().map(|error| error.code);

        assert_eq!(status, Some(StatusCode::INTERNAL_SERVER_ERROR), "500");
    }

    #[test]
    fn warnings_fall_back() {
        let failed: Result<u8, &str> = Err("timeout");
        let succeeded: Result<u8, &str> = Ok(7);

        assert_eq!(failed.or_warn("recording", 1), 1, "fallback used");
        assert_eq!(succeeded.or_warn("recording", 1), 7, "value kept");
    }
}
