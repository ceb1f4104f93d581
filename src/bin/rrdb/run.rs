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

//! Sets up the process and dispatches commands.

use std::fmt::Write;
use std::process;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::thread;

use anyhow::{Context, Result};
use env_logger::Env;
use log::{error, info};
use signal_hook::consts::signal::{SIGINT, SIGTERM};
use signal_hook::iterator::Signals;

use rrdb::store::{Question, Store};
use rrdb::{Deadline, Error};

use crate::args::{Args, Command, ResolveArgs};
use crate::config::{self, Config};
use crate::{record, serve};

/// Runs the command given by `args`, exiting the process on failure.
pub fn run(args: Args) {
    let config = config::load(args.config.as_deref());
    init_logging(config.as_ref().ok());

    if let Err(e) = config.and_then(|config| execute(args, config)) {
        let mut message = String::from("Failed:");
        for (i, cause) in e.chain().enumerate() {
            write!(message, "\n[{}] {}", i + 1, cause).unwrap();
        }
        error!("{}", message);
        process::exit(exit_code(&e));
    }
}

/// Installs the logger. `RUST_LOG` takes precedence over the
/// configured level, which takes precedence over the default.
fn init_logging(config: Option<&Config>) {
    let env = Env::new().default_filter_or("warn");
    let mut builder = env_logger::Builder::from_env(env);
    if std::env::var_os("RUST_LOG").is_none() {
        if let Some(level) = config.and_then(|c| c.log_level) {
            builder.filter_level(level.0);
        }
    }
    builder.init();
}

/// Chooses the exit status for a failure by the kind of the
/// [`rrdb::Error`] behind it, if any.
fn exit_code(error: &anyhow::Error) -> i32 {
    match error.chain().find_map(|cause| cause.downcast_ref::<Error>()) {
        Some(Error::Validation(_) | Error::ConstraintViolation(_)) => 2,
        Some(Error::NotFound) => 3,
        Some(Error::Cancelled) => 4,
        Some(Error::Server(_)) | None => 1,
    }
}

fn execute(args: Args, config: Config) -> Result<()> {
    let database = args.database.unwrap_or_else(|| config.database.clone());
    config::log_summary(&config, &database);
    let store = Store::new(&database, config.busy_timeout());
    let signals = set_up_signal_handling().context("failed to set up signal handling")?;

    match args.command {
        Command::Serve(serve_args) => serve::serve(store, &config.serve, serve_args, signals),
        Command::Migrate => with_cancellation(signals, |deadline| {
            store
                .migrate(deadline)
                .with_context(|| format!("failed to migrate {}", database.display()))?;
            info!("The database at {} is ready.", database.display());
            Ok(())
        }),
        Command::Record(record_command) => with_cancellation(signals, |deadline| {
            record::execute(&store, record_command, deadline)
        }),
        Command::Resolve(resolve_args) => {
            with_cancellation(signals, |deadline| resolve(&store, resolve_args, deadline))
        }
    }
}

/// Runs `f` with a [`Deadline`] that is cancelled when the first
/// termination signal arrives.
fn with_cancellation<F>(mut signals: Signals, f: F) -> Result<()>
where
    F: FnOnce(&Deadline) -> Result<()>,
{
    let (deadline, canceller) = Deadline::none().with_canceller();
    thread::Builder::new()
        .name("signals".to_owned())
        .spawn(move || {
            if let Some(signal) = signals.forever().next() {
                info!("Received {}; cancelling.", signal_name(signal));
                canceller.cancel();
            }
        })
        .context("failed to start the signal thread")?;
    f(&deadline)
}

fn resolve(store: &Store, args: ResolveArgs, deadline: &Deadline) -> Result<()> {
    let question = Question {
        name: args.name,
        qtype: args.rr_type,
    };
    let answer = store
        .resolve(&question, deadline)
        .with_context(|| format!("failed to resolve {} {}", question.name, question.qtype))?;
    for line in answer {
        println!("{line}");
    }
    Ok(())
}

pub fn signal_name(signal: i32) -> &'static str {
    match signal {
        SIGINT => "SIGINT",
        SIGTERM => "SIGTERM",
        _ => "a signal",
    }
}

fn set_up_signal_handling() -> Result<Signals> {
    let term_signals = &[SIGINT, SIGTERM];
    let already_terminating = Arc::new(AtomicBool::new(false));

    // A second termination signal exits immediately, without waiting
    // for the first to be handled.
    for sig in term_signals {
        signal_hook::flag::register_conditional_shutdown(*sig, 1, already_terminating.clone())?;
        signal_hook::flag::register(*sig, already_terminating.clone())?;
    }

    Signals::new(term_signals).map_err(Into::into)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_codes_follow_the_error_kind() {
        let code = |e: Error| exit_code(&anyhow::Error::new(e).context("failed"));
        assert_eq!(code(Error::invalid("zone", "required")), 2);
        assert_eq!(code(Error::NotFound), 3);
        assert_eq!(code(Error::Cancelled), 4);
        assert_eq!(exit_code(&anyhow::anyhow!("unrelated")), 1);
    }
}
