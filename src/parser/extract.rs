//! Subject, number and prerequisite extraction from course text.
//!
//! Sample descriptions from the catalog:
//!
//! ```text
//! Prerequisite: none.  Offered in the Fall semester.
//! Prerequisite: Math 225 (May be taken concurrently. )  (All prerequisites must have a grade of C- or better).Offered every semester. 4 credits
//! Prerequisites: HARP 170 and enrollment in Freshman Research Immersion (FRI) program (All prerequisites must have a grade of C- or better).  Offered in the Spring semester.
//! Prerequisite: CS 110,CS Majors may request a waiver from the Undergraduate Director based on prior programming experience.  Math 225 (All prerequisites must have a grade of C- or better). Offered every semester.
//! ```

use std::sync::LazyLock;

use regex::Regex;

use crate::course::{Course, Prereq};
use crate::error::CatalogError;

/// `SUBJ 123 - Title`. The number may carry a one-letter suffix (`CS 491A`).
static NAME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(?P<subject>[A-Za-z]+)\s+(?P<number>\d+[A-Za-z]?)\s+-\s+(?P<title>.+?)\s*$").unwrap()
});

/// A capitalized 2-5 letter subject followed by a three digit course number.
/// Keeps "4 credits", "grade of C-" and years out of the results. Narrower
/// than the number in `NAME_RE`: free text has no dash to anchor on, so four
/// digit numbers are not read as courses, and any capitalized word in front
/// of three digits (`Level 300`) is.
static COURSE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b([A-Z][A-Za-z]{1,4})\s+(\d{3}[A-Za-z]?)\b").unwrap());

/// Split a raw course name into `(subject, number, title)`.
pub fn parse_name(name: &str) -> Result<(String, String, String), CatalogError> {
    let caps = NAME_RE
        .captures(name)
        .ok_or_else(|| CatalogError::UnparsableName(name.to_string()))?;
    Ok((
        caps["subject"].to_string(),
        caps["number"].to_string(),
        caps["title"].to_string(),
    ))
}

/// Every course reference in `desc`, in order of appearance.
///
/// "and" and "or" are not told apart: `CS 110 or CS 140` gives both courses.
/// Repeated references are kept.
pub fn parse_prereqs(desc: &str) -> Vec<Prereq> {
    COURSE_RE
        .captures_iter(desc)
        .map(|caps| Prereq::new(&caps[1], &caps[2]))
        .collect()
}

/// Fill in subject, number and prerequisites. The title is replaced by the
/// part of the name after the dash.
pub fn enrich(course: &mut Course) -> Result<(), CatalogError> {
    let name = course.title.as_deref().ok_or(CatalogError::MissingTitle)?;
    let (subject, number, title) = parse_name(name)?;
    course.subject = Some(subject);
    course.number = Some(number);
    course.title = Some(title);
    course.prereqs = course
        .description
        .as_deref()
        .map(parse_prereqs)
        .unwrap_or_default();
    Ok(())
}
