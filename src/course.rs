use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::error::CatalogError;

/// Separator between entries of a level list ("Undergraduate, Graduate").
const LEVEL_SEPARATOR: &str = ", ";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Level {
    Undergraduate,
    Graduate,
}

impl Level {
    const NAMES: &'static [(&'static str, Level)] = &[
        ("Undergraduate", Level::Undergraduate),
        ("Graduate", Level::Graduate),
    ];

    pub fn name(self) -> &'static str {
        match self {
            Level::Undergraduate => "Undergraduate",
            Level::Graduate => "Graduate",
        }
    }

    /// Parse a comma-separated level list. Names are matched exactly.
    pub fn parse_list(text: &str) -> Result<Vec<Level>, CatalogError> {
        text.split(LEVEL_SEPARATOR).map(str::parse).collect()
    }
}

impl FromStr for Level {
    type Err = CatalogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::NAMES
            .iter()
            .find(|(name, _)| *name == s)
            .map(|(_, level)| *level)
            .ok_or_else(|| CatalogError::UnknownLevel(s.to_string()))
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A `(subject, number)` pair pulled out of a course description.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Prereq {
    pub subject: String,
    pub number: String,
}

impl Prereq {
    pub fn new(subject: impl Into<String>, number: impl Into<String>) -> Self {
        Self {
            subject: subject.into(),
            number: number.into(),
        }
    }
}

impl fmt::Display for Prereq {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.subject, self.number)
    }
}

/// One course as read from the catalog table.
///
/// `title`, `description` and `levels` come from the state machine;
/// `subject`, `number` and `prereqs` are filled in afterwards by
/// [`crate::parser::extract::enrich`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Course {
    pub title: Option<String>,
    /// `Some("")` when the page went straight to the level list.
    pub description: Option<String>,
    pub levels: Vec<Level>,
    pub subject: Option<String>,
    pub number: Option<String>,
    pub prereqs: Vec<Prereq>,
}

impl Course {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate a course before it leaves the parser. The description is optional.
    pub fn finalize(&self) -> Result<(), CatalogError> {
        match self.title.as_deref() {
            Some(title) if !title.is_empty() => Ok(()),
            _ => Err(CatalogError::MissingTitle),
        }
    }
}

impl fmt::Display for Course {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let title = self.title.as_deref().unwrap_or("");
        match (&self.subject, &self.number) {
            (Some(subject), Some(number)) => write!(f, "{} {} - {}", subject, number, title),
            _ => f.write_str(title),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn level_list() {
        let levels = Level::parse_list("Undergraduate, Graduate").unwrap();
        assert_eq!(levels, vec![Level::Undergraduate, Level::Graduate]);
    }

    #[test]
    fn single_level() {
        assert_eq!(Level::parse_list("Graduate").unwrap(), vec![Level::Graduate]);
    }

    #[test]
    fn misspelled_level() {
        let err = Level::parse_list("Undegraduate").unwrap_err();
        assert!(matches!(err, CatalogError::UnknownLevel(ref l) if l == "Undegraduate"));
    }

    #[test]
    fn level_names_are_case_sensitive() {
        assert!("graduate".parse::<Level>().is_err());
        assert_eq!(Level::Graduate.to_string(), "Graduate");
    }

    #[test]
    fn separator_without_space_is_one_token() {
        // "Undergraduate,Graduate" is a single unknown name, not two levels
        assert!(Level::parse_list("Undergraduate,Graduate").is_err());
    }

    #[test]
    fn finalize_requires_title() {
        assert!(matches!(Course::new().finalize(), Err(CatalogError::MissingTitle)));

        let empty = Course {
            title: Some(String::new()),
            ..Course::default()
        };
        assert!(matches!(empty.finalize(), Err(CatalogError::MissingTitle)));

        let ok = Course {
            title: Some("CS 101 - Intro".into()),
            ..Course::default()
        };
        assert!(ok.finalize().is_ok());
    }

    #[test]
    fn display() {
        let mut c = Course {
            title: Some("Data Structures".into()),
            ..Course::default()
        };
        assert_eq!(c.to_string(), "Data Structures");
        c.subject = Some("CS".into());
        c.number = Some("240".into());
        assert_eq!(c.to_string(), "CS 240 - Data Structures");
    }
}
