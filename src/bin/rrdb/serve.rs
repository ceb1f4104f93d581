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

//! Implements the `serve` command.

use std::net::TcpListener;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use log::info;
use signal_hook::iterator::Signals;

use rrdb::server::{Server, ServerConfig, WorkerPool};
use rrdb::store::Store;
use rrdb::Deadline;

use crate::args::ServeArgs;
use crate::config::ServeConfig;
use crate::run::signal_name;

/// Serves until a termination signal arrives.
pub fn serve(store: Store, config: &ServeConfig, args: ServeArgs, mut signals: Signals) -> Result<()> {
    info!(
        "rrdb v{}.{}.{} starting.",
        env!("CARGO_PKG_VERSION_MAJOR"),
        env!("CARGO_PKG_VERSION_MINOR"),
        env!("CARGO_PKG_VERSION_PATCH"),
    );

    // Fail fast if the database is unusable.
    store
        .ping(&Deadline::after(Duration::from_millis(config.request_timeout_ms)))
        .with_context(|| format!("failed to open the database at {}", store.path().display()))?;

    let bind = args.bind.unwrap_or(config.bind);
    let listener = TcpListener::bind(bind).with_context(|| format!("failed to bind {bind}"))?;
    let pool = WorkerPool::start("tcp", config.workers).context("failed to start workers")?;
    let server = Arc::new(Server::new(
        store,
        ServerConfig {
            request_timeout: Duration::from_millis(config.request_timeout_ms),
            idle_timeout: Duration::from_millis(config.idle_timeout_ms),
        },
    ));
    server
        .start(listener, &pool)
        .context("failed to start the server")?;

    if let Some(signal) = signals.forever().next() {
        info!("Received {}; shutting down.", signal_name(signal));
    }
    pool.shut_down();
    pool.await_shutdown();
    info!("Shutdown complete.");
    Ok(())
}
