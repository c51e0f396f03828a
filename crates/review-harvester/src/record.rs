//! The extracted record and its fixed column order.

use serde::{Deserialize, Serialize};

/// Output column order, shared by every table writer.
pub const COLUMNS: [&str; 14] = [
    "url",
    "title",
    "score",
    "year",
    "decade",
    "runtime_minutes",
    "box_office",
    "genre",
    "subgenre",
    "studio",
    "country",
    "director",
    "starring",
    "awards",
];

/// One review page, extracted.
///
/// Every field is plain text. A field that could not be located is the empty
/// string; no field is ever absent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    pub url: String,
    pub title: String,
    pub score: String,
    pub year: String,
    pub decade: String,
    pub runtime_minutes: String,
    pub box_office: String,
    pub genre: String,
    pub subgenre: String,
    pub studio: String,
    pub country: String,
    pub director: String,
    pub starring: String,
    pub awards: String,
}

impl Record {
    /// A record for `url` with every other field empty.
    pub fn empty(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Self::default()
        }
    }

    /// Field values in [`COLUMNS`] order.
    pub fn values(&self) -> [&str; 14] {
        [
            &self.url,
            &self.title,
            &self.score,
            &self.year,
            &self.decade,
            &self.runtime_minutes,
            &self.box_office,
            &self.genre,
            &self.subgenre,
            &self.studio,
            &self.country,
            &self.director,
            &self.starring,
            &self.awards,
        ]
    }

    /// Value of the named column, if the column exists.
    pub fn get(&self, column: &str) -> Option<&str> {
        COLUMNS
            .iter()
            .position(|c| *c == column)
            .map(|i| self.values()[i])
    }
}
