// Copyright 2022 Matthew Ingwersen.
//
// Licensed under the Apache License, Version 2.0 (the "License"); you
// may not use this file except in compliance with the License. You may
// obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or
// implied. See the License for the specific language governing
// permissions and limitations under the License.

//! Request and response messages.

use serde::{Deserialize, Serialize};

/// A request. The kind is determined by which fields are present.
#[derive(Debug, Deserialize, Eq, PartialEq)]
#[serde(untagged)]
pub(super) enum Request {
    Resolve {
        name: String,
        #[serde(rename = "type")]
        qtype: u16,
    },
    Health {
        health: Probe,
    },
}

#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "lowercase")]
pub(super) enum Probe {
    Liveness,
    Readiness,
}

/// A response to a [`Request`].
#[derive(Debug, Eq, PartialEq, Serialize)]
#[serde(untagged)]
pub(super) enum Response {
    Answer {
        answer: Vec<String>,
        ns: Vec<String>,
        extra: Vec<String>,
    },
    Status {
        status: &'static str,
    },
    Error {
        error: ErrorBody,
    },
}

#[derive(Debug, Eq, PartialEq, Serialize)]
pub(super) struct ErrorBody {
    pub code: ErrorCode,
    pub message: String,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub(super) enum ErrorCode {
    InvalidArgument,
    NotFound,
    DeadlineExceeded,
    Internal,
}

impl Response {
    pub fn answer(answer: Vec<String>) -> Self {
        Self::Answer {
            answer,
            ns: Vec::new(),
            extra: Vec::new(),
        }
    }

    pub fn ok() -> Self {
        Self::Status { status: "ok" }
    }

    pub fn error(code: ErrorCode, message: impl Into<String>) -> Self {
        Self::Error {
            error: ErrorBody {
                code,
                message: message.into(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn requests_are_told_apart_by_their_fields() {
        assert_eq!(
            serde_json::from_str::<Request>(r#"{"name": "example.com.", "type": 1}"#).unwrap(),
            Request::Resolve {
                name: "example.com.".into(),
                qtype: 1,
            },
        );
        assert_eq!(
            serde_json::from_str::<Request>(r#"{"health": "readiness"}"#).unwrap(),
            Request::Health {
                health: Probe::Readiness,
            },
        );
        assert!(serde_json::from_str::<Request>(r#"{"name": "example.com.", "type": 65536}"#).is_err());
        assert!(serde_json::from_str::<Request>(r#"{"health": "vitality"}"#).is_err());
    }

    #[test]
    fn responses_serialize_as_documented() {
        assert_eq!(
            serde_json::to_string(&Response::answer(vec!["a".into()])).unwrap(),
            r#"{"answer":["a"],"ns":[],"extra":[]}"#,
        );
        assert_eq!(
            serde_json::to_string(&Response::ok()).unwrap(),
            r#"{"status":"ok"}"#,
        );
        assert_eq!(
            serde_json::to_string(&Response::error(ErrorCode::DeadlineExceeded, "late")).unwrap(),
            r#"{"error":{"code":"DEADLINE_EXCEEDED","message":"late"}}"#,
        );
    }
}
