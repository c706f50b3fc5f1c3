//! Citation strings for ECitMatch
//!
//! NCBI expects each citation as
//! `journal_title|year|volume|first_page|author_name|your_key|` with spaces
//! written as `+`. Several citations are sent together separated by `%0D`.
//! `Display` gives the readable form; [`Citation::to_bdata`] also
//! percent-encodes reserved characters inside each field.

use std::fmt;
use std::ops::Add;

use serde::{Deserialize, Serialize};

/// Separator between citations in a `bdata` payload (an encoded carriage return)
pub const BDATA_SEPARATOR: &str = "%0D";

/// One citation to be matched against PubMed
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Citation {
    pub journal: String,
    pub year: String,
    pub volume: String,
    pub first_page: String,
    pub author: String,
    /// Caller-chosen label echoed back by NCBI
    pub key: String,
}

impl Citation {
    /// # Example
    ///
    /// ```
    /// use entrez_client_rs::Citation;
    ///
    /// let citation = Citation::new("Cancer Biology", 2009, 12, 100, "Smith J", "k1");
    /// assert_eq!(citation.to_string(), "Cancer+Biology|2009|12|100|Smith+J|k1");
    /// ```
    pub fn new(
        journal: impl Into<String>,
        year: impl ToString,
        volume: impl ToString,
        first_page: impl ToString,
        author: impl Into<String>,
        key: impl Into<String>,
    ) -> Self {
        Self {
            journal: journal.into(),
            year: year.to_string(),
            volume: volume.to_string(),
            first_page: first_page.to_string(),
            author: author.into(),
            key: key.into(),
        }
    }

    /// Wire form with the trailing `|` NCBI expects
    ///
    /// Each field is percent-encoded with spaces written as `+`, so only the
    /// `|` separators stay literal.
    pub fn to_bdata(&self) -> String {
        let mut bdata = [
            self.journal.as_str(),
            self.year.as_str(),
            self.volume.as_str(),
            self.first_page.as_str(),
            self.author.as_str(),
            self.key.as_str(),
        ]
        .into_iter()
        .map(bdata_field)
        .collect::<Vec<_>>()
        .join("|");
        bdata.push('|');
        bdata
    }
}

impl fmt::Display for Citation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}|{}|{}|{}|{}|{}",
            plus_quote(&self.journal),
            self.year,
            self.volume,
            self.first_page,
            plus_quote(&self.author),
            self.key
        )
    }
}

fn plus_quote(value: &str) -> String {
    value.trim().replace(' ', "+")
}

fn bdata_field(value: &str) -> String {
    urlencoding::encode(value.trim()).replace("%20", "+")
}

/// Ordered set of citations, duplicates dropped on insertion
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CitationSet {
    citations: Vec<Citation>,
}

impl CitationSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a citation unless an identical one is already present
    ///
    /// Returns whether the citation was added.
    pub fn insert(&mut self, citation: Citation) -> bool {
        if self.citations.contains(&citation) {
            return false;
        }
        self.citations.push(citation);
        true
    }

    pub fn len(&self) -> usize {
        self.citations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.citations.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Citation> {
        self.citations.iter()
    }

    /// `bdata` value for ECitMatch: citation strings joined by `%0D`
    pub fn to_bdata(&self) -> String {
        self.citations
            .iter()
            .map(Citation::to_bdata)
            .collect::<Vec<_>>()
            .join(BDATA_SEPARATOR)
    }
}

impl fmt::Display for CitationSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, citation) in self.citations.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{citation}")?;
        }
        Ok(())
    }
}

impl From<Citation> for CitationSet {
    fn from(citation: Citation) -> Self {
        let mut set = Self::new();
        set.insert(citation);
        set
    }
}

impl FromIterator<Citation> for CitationSet {
    fn from_iter<I: IntoIterator<Item = Citation>>(iter: I) -> Self {
        let mut set = Self::new();
        for citation in iter {
            set.insert(citation);
        }
        set
    }
}

impl Extend<Citation> for CitationSet {
    fn extend<I: IntoIterator<Item = Citation>>(&mut self, iter: I) {
        for citation in iter {
            self.insert(citation);
        }
    }
}

impl<'a> IntoIterator for &'a CitationSet {
    type Item = &'a Citation;
    type IntoIter = std::slice::Iter<'a, Citation>;

    fn into_iter(self) -> Self::IntoIter {
        self.citations.iter()
    }
}

impl Add for Citation {
    type Output = CitationSet;

    fn add(self, other: Citation) -> CitationSet {
        let mut set = CitationSet::from(self);
        set.insert(other);
        set
    }
}

impl Add<Citation> for CitationSet {
    type Output = CitationSet;

    fn add(mut self, other: Citation) -> CitationSet {
        self.insert(other);
        self
    }
}

impl Add for CitationSet {
    type Output = CitationSet;

    fn add(mut self, other: CitationSet) -> CitationSet {
        self.extend(other.citations);
        self
    }
}

/// Outcome of matching one citation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CitationMatchStatus {
    Found,
    NotFound,
    Ambiguous,
}

/// One line of an ECitMatch reply
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CitationMatch {
    pub journal: String,
    pub year: String,
    pub volume: String,
    pub first_page: String,
    pub author_name: String,
    pub key: String,
    pub pmid: Option<String>,
    pub status: CitationMatchStatus,
}

impl CitationMatch {
    /// Parse one pipe-delimited reply line; `None` for blank or short lines
    pub fn from_line(line: &str) -> Option<Self> {
        let line = line.trim();
        if line.is_empty() {
            return None;
        }

        let fields: Vec<&str> = line.split('|').map(str::trim).collect();
        let [journal, year, volume, first_page, author, key, pmid, ..] = fields.as_slice() else {
            return None;
        };

        let (pmid, status) = match *pmid {
            "" => (None, CitationMatchStatus::NotFound),
            p if p.to_ascii_uppercase().starts_with("AMBIGUOUS") => {
                (None, CitationMatchStatus::Ambiguous)
            }
            p if p.to_ascii_uppercase().starts_with("NOT_FOUND") => {
                (None, CitationMatchStatus::NotFound)
            }
            p => (Some(p.to_string()), CitationMatchStatus::Found),
        };

        Some(Self {
            journal: journal.replace('+', " "),
            year: year.to_string(),
            volume: volume.to_string(),
            first_page: first_page.to_string(),
            author_name: author.replace('+', " "),
            key: key.to_string(),
            pmid,
            status,
        })
    }
}

/// Parse a whole ECitMatch reply, skipping lines that do not have all fields
pub fn parse_citation_matches(text: &str) -> Vec<CitationMatch> {
    text.lines().filter_map(CitationMatch::from_line).collect()
}
