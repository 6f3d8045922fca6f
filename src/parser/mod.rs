pub mod catalog;
pub mod extract;
pub mod markup;

use rayon::prelude::*;
use tracing::debug;

use crate::course::Course;
use crate::error::CatalogError;

/// Two-pass pipeline: html → markup events → course records.
pub fn parse_catalog(html: &str) -> Result<Vec<Course>, CatalogError> {
    let courses = catalog::parse_events(markup::events(html))?;
    debug!(
        "Courses:\n{}",
        courses
            .iter()
            .map(|c| c.to_string())
            .collect::<Vec<_>>()
            .join("\n")
    );
    Ok(courses)
}

/// Run [`extract::enrich`] over every course. On failure the error of the
/// earliest course in document order is returned.
pub fn enrich_all(courses: &mut [Course]) -> Result<(), CatalogError> {
    let results: Vec<_> = courses.par_iter_mut().map(extract::enrich).collect();
    results.into_iter().collect()
}
