//! Request ids, echoed back in `x-request-id`.

use std::fmt::{Display, Formatter, Result as FmtResult};

use salvo::{http::header::HeaderValue, prelude::Response};
use tracing::warn;
use uuid::Uuid;

pub(super) const REQUEST_ID_HEADER: &str = "x-request-id";

const MAX_LENGTH: usize = 128;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) struct RequestId(String);

impl RequestId {
    /// Keeps a caller-supplied id when it is short printable ASCII,
    /// otherwise generates a fresh one.
    pub(super) fn from_header(value: Option<&str>) -> Self {
        value
            .map(str::trim)
            .filter(|value| {
                !value.is_empty()
                    && value.len() <= MAX_LENGTH
                    && value.bytes().all(|byte| byte.is_ascii_graphic())
            })
            .map_or_else(Self::generate, |value| Self(value.to_owned()))
    }

    fn generate() -> Self {
        Self(Uuid::now_v7().to_string())
    }

    pub(super) fn write_header(&self, res: &mut Response) {
        match HeaderValue::from_str(&self.0) {
            Ok(value) => {
                res.headers_mut().insert(REQUEST_ID_HEADER, value);
            }
            Err(source) => warn!(request_id = %self, "request id is not a valid header: {source}"),
        }
    }
}

impl Display for RequestId {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(&self.0)
    }
}
