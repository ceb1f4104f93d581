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

//! Implements the `record` commands.
//!
//! Records are printed to standard output as JSON. So are failures, in
//! the shape `{"message": ..., "fields": {...}}`, before the error is
//! returned to the caller for logging and the exit status.

use std::collections::BTreeMap;

use anyhow::{Context, Result};
use serde::Serialize;
use time::OffsetDateTime;

use rrdb::error::{Error, FieldError};
use rrdb::name::Name;
use rrdb::normalize::RecordParams;
use rrdb::rr::ResourceRecord;
use rrdb::store::{Record, Store};
use rrdb::Deadline;

use crate::args::RecordCommand;

/// Executes a `record` subcommand.
pub fn execute(store: &Store, command: RecordCommand, deadline: &Deadline) -> Result<()> {
    match command {
        RecordCommand::Create(record_args) => {
            let outcome = prepare(record_args.into()).and_then(|p| store.create(&p, deadline));
            print_record(outcome, Input::Fields).context("failed to create the record")
        }
        RecordCommand::Read { id } => print_record(store.read(id, deadline), Input::Params)
            .with_context(|| format!("failed to read record {id}")),
        RecordCommand::Update { id, record } => {
            let outcome =
                prepare(record.into()).and_then(|p| store.update(id, &p, deadline));
            print_record(outcome, Input::Fields)
                .with_context(|| format!("failed to update record {id}"))
        }
        RecordCommand::Delete { id } => print_record(store.delete(id, deadline), Input::Params)
            .with_context(|| format!("failed to delete record {id}")),
        RecordCommand::List { zone } => {
            let outcome = parse_zone(&zone).and_then(|z| store.list_by_zone(&z, deadline));
            let printed = match outcome {
                Ok(records) => {
                    let output: Vec<_> = records.iter().map(RecordOutput::from).collect();
                    print_json(&output)
                }
                Err(e) => fail(e, Input::Params),
            };
            printed.with_context(|| format!("failed to list the records of zone {zone:?}"))
        }
    }
}

/// Validates `params` and replaces the presentation with its canonical
/// form.
fn prepare(mut params: RecordParams) -> Result<RecordParams, Error> {
    params.validate()?;
    let record: ResourceRecord = params
        .presentation
        .parse()
        .map_err(|e| Error::invalid("content", format!("{e}")))?;
    params.presentation = record.to_string();
    Ok(params)
}

/// Parses the `zone` parameter of `record list`.
fn parse_zone(zone: &str) -> Result<Name, Error> {
    if zone.is_empty() {
        Err(Error::invalid("zone", "required"))
    } else if !zone.ends_with('.') {
        Err(Error::invalid("zone", "must end with '.'"))
    } else {
        Name::parse_qualified(zone).map_err(|e| Error::invalid("zone", format!("{e}")))
    }
}

////////////////////////////////////////////////////////////////////////
// OUTPUT                                                             //
////////////////////////////////////////////////////////////////////////

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RecordOutput<'a> {
    id: i64,
    zone: String,
    content: &'a str,
    #[serde(skip_serializing_if = "str::is_empty")]
    comment: &'a str,
    #[serde(with = "time::serde::rfc3339")]
    created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    updated_on: OffsetDateTime,
}

impl<'a> From<&'a Record> for RecordOutput<'a> {
    fn from(record: &'a Record) -> Self {
        Self {
            id: record.id,
            zone: record.zone.to_string(),
            content: &record.presentation,
            comment: &record.comment,
            created_at: record.created_at,
            updated_on: record.modified_at,
        }
    }
}

#[derive(Debug, Default, Serialize)]
struct ErrorOutput {
    message: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    fields: Option<BTreeMap<&'static str, String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    params: Option<BTreeMap<&'static str, String>>,
}

/// Where the input of a command came from: the request body of a write
/// or the identifying parameters of a read. This decides where
/// validation problems are reported.
#[derive(Clone, Copy, Debug)]
enum Input {
    Fields,
    Params,
}

impl ErrorOutput {
    fn new(error: &Error, input: Input) -> Self {
        match error {
            Error::Validation(field_errors) => {
                let details = Some(collect_field_errors(field_errors));
                match input {
                    Input::Fields => Self {
                        message: "bad request",
                        fields: details,
                        params: None,
                    },
                    Input::Params => Self {
                        message: "bad request",
                        fields: None,
                        params: details,
                    },
                }
            }
            Error::ConstraintViolation(_) => Self {
                message: "conflict",
                ..Default::default()
            },
            Error::NotFound => Self {
                message: "not found",
                ..Default::default()
            },
            Error::Cancelled => Self {
                message: "request cancelled",
                ..Default::default()
            },
            Error::Server(_) => Self {
                message: "internal server error",
                ..Default::default()
            },
        }
    }
}

/// Joins the messages of field errors that share a key.
fn collect_field_errors(field_errors: &[FieldError]) -> BTreeMap<&'static str, String> {
    let mut map: BTreeMap<&'static str, String> = BTreeMap::new();
    for field_error in field_errors {
        map.entry(field_error.key)
            .and_modify(|message| {
                message.push_str("; ");
                message.push_str(&field_error.message);
            })
            .or_insert_with(|| field_error.message.clone());
    }
    map
}

fn print_record(outcome: Result<Record, Error>, input: Input) -> Result<()> {
    match outcome {
        Ok(record) => print_json(&RecordOutput::from(&record)),
        Err(e) => fail(e, input),
    }
}

/// Prints the JSON form of `error` and returns it.
fn fail(error: Error, input: Input) -> Result<()> {
    print_json(&ErrorOutput::new(&error, input))?;
    Err(error.into())
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).context("failed to serialize the output")?;
    println!("{json}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rrdb::error::Conflict;
    use rrdb::rr::Type;

    #[test]
    fn prepare_canonicalizes_the_content() {
        let params = prepare(RecordParams {
            zone: "example.com.".into(),
            presentation: "www   300 IN A 192.0.2.1".into(),
            comment: String::new(),
        })
        .unwrap();
        assert_eq!(params.presentation, "www.\t300\tIN\tA\t192.0.2.1");
    }

    #[test]
    fn prepare_reports_every_field() {
        let error = prepare(RecordParams::default()).unwrap_err();
        let output = serde_json::to_value(ErrorOutput::new(&error, Input::Fields)).unwrap();
        assert_eq!(
            output,
            serde_json::json!({
                "message": "bad request",
                "fields": {"zone": "required", "content": "required"},
            }),
        );
    }

    #[test]
    fn list_zone_must_be_fully_qualified() {
        assert!(matches!(
            parse_zone(""),
            Err(Error::Validation(ref errors)) if errors[0].message == "required"
        ));
        assert!(matches!(
            parse_zone("example.com"),
            Err(Error::Validation(ref errors)) if errors[0].key == "zone"
        ));
        assert_eq!(parse_zone("example.com.").unwrap(), "example.com.".parse().unwrap());
    }

    #[test]
    fn errors_map_to_messages() {
        let conflict = Error::ConstraintViolation(Conflict {
            zone: "example.com.".parse().unwrap(),
            name: "foo.example.com.".parse().unwrap(),
            existing: Type::A,
            attempted: Type::CNAME,
        });
        let messages: Vec<_> = [conflict, Error::NotFound, Error::Cancelled]
            .iter()
            .map(|e| ErrorOutput::new(e, Input::Params).message)
            .collect();
        assert_eq!(messages, ["conflict", "not found", "request cancelled"]);

        let output = serde_json::to_value(ErrorOutput::new(
            &Error::invalid("zone", "must end with '.'"),
            Input::Params,
        ))
        .unwrap();
        assert_eq!(output["params"]["zone"], "must end with '.'");
        assert!(output.get("fields").is_none());
    }

    #[test]
    fn records_serialize_with_rfc3339_times() {
        let created_at = OffsetDateTime::from_unix_timestamp(1_600_000_000).unwrap();
        let record = Record {
            id: 3,
            zone: "example.com.".parse().unwrap(),
            name: "www.example.com.".parse().unwrap(),
            presentation: "www.\t300\tIN\tA\t192.0.2.1".into(),
            rr_type: Type::A,
            is_wildcard: false,
            comment: String::new(),
            created_at,
            modified_at: created_at,
        };
        let output = serde_json::to_value(RecordOutput::from(&record)).unwrap();
        assert_eq!(
            output,
            serde_json::json!({
                "id": 3,
                "zone": "example.com.",
                "content": "www.\t300\tIN\tA\t192.0.2.1",
                "createdAt": "2020-09-13T12:26:40Z",
                "updatedOn": "2020-09-13T12:26:40Z",
            }),
        );
    }
}
