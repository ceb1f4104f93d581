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

//! An authoritative DNS record store.
//!
//! Zone data is persisted in a relational database (SQLite) as one row
//! per resource record, keyed by the zone it belongs to and the
//! fully-qualified owner name derived from its presentation format.
//! On top of the raw rows, the [`store`] module enforces the zone-model
//! invariants a plain key-value store would not: CNAME exclusivity
//! ([RFC 1034 § 3.6.2]) at write time, and exact-then-wildcard lookup
//! with longest-match precedence ([RFC 4592]) at query time.
//!
//! The pieces, leaves first:
//!
//! * [`name`], [`class`], and [`rr`] provide domain names, classes,
//!   RR types, TTLs, and typed RDATA.
//! * [`presentation`] parses single resource records in the
//!   [RFC 1035 § 5] presentation format.
//! * [`normalize`] derives a record's stored owner name and wildcard
//!   flag from its zone and presentation.
//! * [`store`] persists records and answers questions.
//! * [`server`] exposes the resolution surface over TCP.
//!
//! [RFC 1034 § 3.6.2]: https://datatracker.ietf.org/doc/html/rfc1034#section-3.6.2
//! [RFC 1035 § 5]: https://datatracker.ietf.org/doc/html/rfc1035#section-5
//! [RFC 4592]: https://datatracker.ietf.org/doc/html/rfc4592

pub mod class;
pub mod deadline;
pub mod error;
pub mod name;
pub mod normalize;
pub mod presentation;
pub mod rr;
pub mod server;
pub mod store;
mod util;

pub use deadline::{Canceller, Deadline};
pub use error::Error;
