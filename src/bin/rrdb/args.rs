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

//! Implements command-line argument parsing.

use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::anyhow;
use clap::{Parser, Subcommand};

use rrdb::name::Name;
use rrdb::normalize::RecordParams;
use rrdb::rr::Type;

/// Parses the command line arguments.
pub fn parse() -> Args {
    Args::parse()
}

/// An authoritative DNS record store
#[derive(Debug, Parser)]
#[clap(author, version)]
pub struct Args {
    /// Set the configuration file to use
    #[clap(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Set the database file, overriding the configuration
    #[clap(long, global = true, value_name = "FILE")]
    pub database: Option<PathBuf>,

    #[clap(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Provision the database schema
    Migrate,

    /// Manage records
    #[clap(subcommand)]
    Record(RecordCommand),

    /// Answer a question from the database
    Resolve(ResolveArgs),

    /// Answer questions over TCP
    Serve(ServeArgs),
}

#[derive(Debug, Subcommand)]
pub enum RecordCommand {
    /// Create a record
    Create(RecordArgs),

    /// Show a record
    Read {
        /// The record's identifier
        id: i64,
    },

    /// Replace a record's zone, content, and comment
    Update {
        /// The record's identifier
        id: i64,

        #[clap(flatten)]
        record: RecordArgs,
    },

    /// Delete a record
    Delete {
        /// The record's identifier
        id: i64,
    },

    /// List the records of a zone
    List {
        /// The zone, fully qualified
        #[clap(long, default_value = "")]
        zone: String,
    },
}

/// The fields of a record. Missing fields are left empty and reported
/// by validation rather than by the argument parser, so that all
/// problems are reported at once.
#[derive(Debug, Parser)]
pub struct RecordArgs {
    /// The zone, fully qualified
    #[clap(long, default_value = "")]
    pub zone: String,

    /// The record in presentation format, with its owner relative to
    /// the zone
    #[clap(long, default_value = "", value_name = "RR")]
    pub content: String,

    /// A free-form comment
    #[clap(long, default_value = "")]
    pub comment: String,
}

impl From<RecordArgs> for RecordParams {
    fn from(args: RecordArgs) -> Self {
        Self {
            zone: args.zone,
            presentation: args.content,
            comment: args.comment,
        }
    }
}

#[derive(Debug, Parser)]
pub struct ResolveArgs {
    /// The domain name to look up
    #[clap(value_parser = parse_name)]
    pub name: Name,

    /// The RR type to look up, as a mnemonic or a number
    #[clap(value_name = "TYPE", value_parser = parse_type)]
    pub rr_type: Type,
}

#[derive(Debug, Parser)]
pub struct ServeArgs {
    /// Set the server bind IP address and port, overriding the
    /// configuration
    #[clap(long, value_name = "IP:PORT")]
    pub bind: Option<SocketAddr>,
}

fn parse_name(s: &str) -> anyhow::Result<Name> {
    Name::parse_qualified(s).map_err(|e| anyhow!("invalid domain name: {}", e))
}

fn parse_type(s: &str) -> anyhow::Result<Type> {
    match s.parse::<u16>() {
        Ok(value) => Ok(value.into()),
        Err(_) => s.parse().map_err(|e| anyhow!("invalid RR type: {}", e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn types_may_be_mnemonics_or_numbers() {
        assert_eq!(parse_type("aaaa").unwrap(), Type::AAAA);
        assert_eq!(parse_type("28").unwrap(), Type::AAAA);
        assert_eq!(parse_type("TYPE28").unwrap(), Type::AAAA);
        assert!(parse_type("bogus").is_err());
    }

    #[test]
    fn record_subcommands_parse() {
        let args = Args::try_parse_from([
            "rrdb",
            "record",
            "update",
            "7",
            "--zone",
            "example.com.",
            "--content",
            "www A 192.0.2.1",
            "--database",
            "test.sqlite3",
        ])
        .unwrap();
        assert_eq!(args.database, Some(PathBuf::from("test.sqlite3")));
        match args.command {
            Command::Record(RecordCommand::Update { id, record }) => {
                assert_eq!(id, 7);
                let params = RecordParams::from(record);
                assert_eq!(params.zone, "example.com.");
                assert_eq!(params.presentation, "www A 192.0.2.1");
                assert_eq!(params.comment, "");
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn resolve_names_are_made_fully_qualified() {
        let args = Args::try_parse_from(["rrdb", "resolve", "www.example.com", "A"]).unwrap();
        match args.command {
            Command::Resolve(resolve) => {
                assert_eq!(resolve.name, "www.example.com.".parse().unwrap());
                assert_eq!(resolve.rr_type, Type::A);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }
}
