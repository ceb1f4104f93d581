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

//! Derivation of a record's stored owner name from its zone and
//! presentation.
//!
//! A record is submitted as a zone plus a presentation-format RR whose
//! owner is interpreted relative to that zone: `@` (or an omitted
//! owner) is the zone apex, and any other owner is prefixed to the
//! zone. So in zone `example.com.`, the owner `www` is
//! `www.example.com.`.
//!
//! An owner whose first label is `*` makes the record a wildcard. The
//! stored name of a wildcard record is the name with the `*` label
//! removed, i.e. the root of the subtree it covers.

use crate::error::{Error, FieldError};
use crate::name::Name;
use crate::rr::{ResourceRecord, Type};

/// The result of [`normalize`].
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Normalized {
    /// The zone, fully qualified and lowercased.
    pub zone: Name,

    /// The record's full owner name, lowercased, including any `*`
    /// label.
    pub owner: Name,

    /// The owner name as stored, fully qualified and lowercased; for
    /// wildcards, without the `*` label.
    pub name: Name,

    /// Whether the owner was a wildcard.
    pub is_wildcard: bool,

    /// The RR type of the record.
    pub rr_type: Type,

    /// The parsed record.
    pub record: ResourceRecord,
}

/// Derives the stored owner name, wildcard flag and type of a record.
///
/// `zone` is made fully qualified if it is not. Fails with
/// [`Error::Validation`] if the zone or the presentation is malformed,
/// or if the combined name is too long.
pub fn normalize(zone: &str, presentation: &str) -> Result<Normalized, Error> {
    let zone = Name::parse_qualified(zone).map_err(|e| Error::invalid("zone", e.to_string()))?;
    let record: ResourceRecord = presentation
        .parse()
        .map_err(|e: crate::presentation::Error| Error::invalid("content", e.to_string()))?;

    let zone = zone.to_ascii_lowercase();
    let owner = if record.owner.is_root() {
        zone.clone()
    } else {
        record
            .owner
            .concat(&zone)
            .map_err(|e| Error::invalid("content", format!("owner name in zone: {e}")))?
            .to_ascii_lowercase()
    };

    let (name, is_wildcard) = match owner.strip_wildcard() {
        Some(covered) => (covered, true),
        None => (owner.clone(), false),
    };

    Ok(Normalized {
        zone,
        owner,
        name,
        is_wildcard,
        rr_type: record.rr_type,
        record,
    })
}

////////////////////////////////////////////////////////////////////////
// RECORD PARAMETERS                                                  //
////////////////////////////////////////////////////////////////////////

/// The caller-supplied fields of a record, for creation and update.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct RecordParams {
    pub zone: String,
    pub presentation: String,
    pub comment: String,
}

impl RecordParams {
    /// Checks the parameters as a record-management surface does before
    /// touching the store, reporting every problem at once: the zone
    /// must be present and fully qualified, and the presentation must
    /// be present and parse as a resource record.
    pub fn validate(&self) -> Result<(), Error> {
        let mut errors = Vec::new();
        if self.zone.is_empty() {
            errors.push(FieldError::new("zone", "required"));
        } else if !self.zone.ends_with('.') {
            errors.push(FieldError::new("zone", "must end with '.'"));
        }
        if self.presentation.is_empty() {
            errors.push(FieldError::new("content", "required"));
        } else if let Err(e) = self.presentation.parse::<ResourceRecord>() {
            errors.push(FieldError::new("content", e.to_string()));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(Error::Validation(errors))
        }
    }
}

////////////////////////////////////////////////////////////////////////
// TESTS                                                              //
////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::*;

    fn name(s: &str) -> Name {
        s.parse().unwrap()
    }

    #[test]
    fn apex_owners_become_the_zone() {
        for presentation in [
            "@ IN A 127.0.0.1",
            ". IN A 127.0.0.1",
            "  IN A 127.0.0.1",
        ] {
            let normalized = normalize("example.com.", presentation).unwrap();
            assert_eq!(normalized.name, name("example.com."));
            assert!(!normalized.is_wildcard);
        }
    }

    #[test]
    fn relative_owners_are_prefixed_to_the_zone() {
        let normalized = normalize("example.com.", "foo.bar.baz IN A 127.0.0.1").unwrap();
        assert_eq!(normalized.zone, name("example.com."));
        assert_eq!(normalized.name, name("foo.bar.baz.example.com."));
        assert_eq!(normalized.rr_type, Type::A);
    }

    #[test]
    fn zones_are_made_fully_qualified() {
        let normalized = normalize("example.com", "www A 127.0.0.1").unwrap();
        assert_eq!(normalized.zone, name("example.com."));
        assert_eq!(normalized.name, name("www.example.com."));
    }

    #[test]
    fn wildcards_are_stripped_and_flagged() {
        let normalized = normalize("example.com.", "*.wildcard A 127.0.0.1").unwrap();
        assert_eq!(normalized.owner, name("*.wildcard.example.com."));
        assert_eq!(normalized.name, name("wildcard.example.com."));
        assert!(normalized.is_wildcard);

        let normalized = normalize("example.com.", "* A 127.0.0.1").unwrap();
        assert_eq!(normalized.name, name("example.com."));
        assert!(normalized.is_wildcard);
    }

    #[test]
    fn names_are_lowercased() {
        let normalized = normalize("Example.COM.", "WWW A 127.0.0.1").unwrap();
        assert_eq!(normalized.zone.to_string(), "example.com.");
        assert_eq!(normalized.name.to_string(), "www.example.com.");
        assert_eq!(normalized.record.owner.to_string(), "WWW.");
    }

    #[test]
    fn malformed_input_is_a_validation_error() {
        assert!(matches!(
            normalize("example.com.", "www A not-an-address"),
            Err(Error::Validation(fields)) if fields[0].key == "content",
        ));
        assert!(matches!(
            normalize("a..b", "www A 127.0.0.1"),
            Err(Error::Validation(fields)) if fields[0].key == "zone",
        ));
    }

    #[test]
    fn overlong_combined_names_are_rejected() {
        let long = ["x"; 100].join(".");
        assert!(matches!(
            normalize(&long, &format!("{long} A 127.0.0.1")),
            Err(Error::Validation(fields)) if fields[0].key == "content",
        ));
    }

    #[test]
    fn validate_reports_all_fields() {
        let params = RecordParams::default();
        assert!(matches!(
            params.validate(),
            Err(Error::Validation(fields)) if fields == [
                FieldError::new("zone", "required"),
                FieldError::new("content", "required"),
            ],
        ));

        let params = RecordParams {
            zone: "example.com".into(),
            presentation: "www A bogus".into(),
            comment: String::new(),
        };
        assert!(matches!(
            params.validate(),
            Err(Error::Validation(fields)) if fields.len() == 2
                && fields[0] == FieldError::new("zone", "must end with '.'")
                && fields[1].key == "content",
        ));
    }

    #[test]
    fn validate_accepts_good_params() {
        let params = RecordParams {
            zone: "example.com.".into(),
            presentation: "www A 127.0.0.1".into(),
            comment: "web".into(),
        };
        assert!(params.validate().is_ok());
    }
}
