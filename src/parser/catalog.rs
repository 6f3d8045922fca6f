//! Course table state machine.
//!
//! The page lays each course out as two consecutive `<tr>`s inside one
//! particular `<table>`: the first holds the title, the second the
//! description followed by a "Levels:" label and the level list. The page
//! generator leaves about half of those rows unclosed, so a row is also
//! considered finished when the next one opens or the table ends.

use tracing::{debug, trace, warn};

use super::markup::MarkupEvent;
use crate::course::{Course, Level};
use crate::error::CatalogError;

/// `summary` attribute identifying the course table. There are several
/// tables on the page.
pub const TABLE_SUMMARY: &str = "This table lists all course detail for the selected term.";

/// Label preceding the level list in a course's second row.
pub const LEVELS_MARKER: &str = "Levels:";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    OutsideTable,
    /// In the course table, between courses.
    NoBlock,
    BlockRow1,
    BlockRow2,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CatalogState {
    in_table: bool,
    /// Only tracks row openings: true from a course's first `<tr>` until its
    /// second one opens.
    in_course_block: bool,
    /// The course's second row is open; its close finalizes the course.
    is_last_row_of_block: bool,
    pending: Option<Course>,
    awaiting_levels: bool,
    last_tag: String,
    courses: Vec<Course>,
}

impl CatalogState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> Phase {
        if !self.in_table {
            Phase::OutsideTable
        } else if self.in_course_block {
            Phase::BlockRow1
        } else if self.is_last_row_of_block {
            Phase::BlockRow2
        } else {
            Phase::NoBlock
        }
    }

    pub fn pending(&self) -> Option<&Course> {
        self.pending.as_ref()
    }

    pub fn into_courses(self) -> Vec<Course> {
        self.courses
    }
}

/// Run the machine over a whole event stream, stopping at the first error.
pub fn parse_events<I>(events: I) -> Result<Vec<Course>, CatalogError>
where
    I: IntoIterator<Item = Result<MarkupEvent, CatalogError>>,
{
    let state = events
        .into_iter()
        .try_fold(CatalogState::new(), |state, event| step(state, &event?))?;

    if let Some(course) = state.pending() {
        warn!(
            "Input ended inside the course table. Dropping unfinished course \"{}\".",
            course
        );
    }
    Ok(state.into_courses())
}

/// Apply a single markup event.
pub fn step(state: CatalogState, event: &MarkupEvent) -> Result<CatalogState, CatalogError> {
    match event {
        MarkupEvent::TagOpen { name, .. } => {
            trace!("START <{}> ({:?})", name, state.phase());
            open_tag(state, name, event)
        }
        MarkupEvent::TagClose { name } => {
            trace!("END <{}>", name);
            close_tag(state, name)
        }
        MarkupEvent::Text(text) => {
            trace!("IN ELEMENT <{}>: {}", state.last_tag, text.trim());
            read_text(state, text)
        }
    }
}

fn open_tag(
    mut state: CatalogState,
    name: &str,
    event: &MarkupEvent,
) -> Result<CatalogState, CatalogError> {
    state.last_tag = name.to_string();

    if !state.in_table {
        if name == "table" && event.attribute("summary") == Some(TABLE_SUMMARY) {
            debug!("Entering course table.");
            state.in_table = true;
        }
        return Ok(state);
    }

    if name != "tr" {
        return Ok(state);
    }

    if state.in_course_block {
        // Second and last row of the course. Its text still has to be read,
        // so finalizing waits for the row to close.
        state.is_last_row_of_block = true;
        state.in_course_block = false;
        return Ok(state);
    }

    if state.pending.is_some() {
        debug!("Attempted to start a new row with a course in progress. Force closing the last row.");
        state = step(state, &MarkupEvent::close("tr"))?;
    }

    debug!("Entering course row.");
    state.pending = Some(Course::new());
    state.in_course_block = true;
    Ok(state)
}

fn close_tag(mut state: CatalogState, name: &str) -> Result<CatalogState, CatalogError> {
    if !state.in_table {
        return Ok(state);
    }

    match name {
        // Tables nested inside the course table are not expected.
        "table" => {
            debug!("Exiting course table.");
            if state.pending.is_some() {
                debug!("Attempted to end the table with a course in progress. Force closing the last row.");
                state = step(state, &MarkupEvent::close("tr"))?;
            }
            // Still pending means only a first row was seen: a spacer or
            // navigation row at the bottom of the table, not a course.
            if let Some(row) = state.pending.take() {
                debug!("Discarding single row \"{}\".", row);
                state.in_course_block = false;
                state.awaiting_levels = false;
            }
            state.in_table = false;
            Ok(state)
        }
        "tr" if state.is_last_row_of_block => finish_course(state),
        _ => Ok(state),
    }
}

fn finish_course(mut state: CatalogState) -> Result<CatalogState, CatalogError> {
    debug!("Exiting course row.");
    state.is_last_row_of_block = false;

    let Some(course) = state.pending.take() else {
        return Ok(state);
    };
    if state.awaiting_levels {
        return Err(CatalogError::MalformedBlock {
            title: course.title.unwrap_or_default(),
        });
    }
    course.finalize()?;
    state.courses.push(course);
    Ok(state)
}

fn read_text(mut state: CatalogState, raw: &str) -> Result<CatalogState, CatalogError> {
    let data = raw.trim();
    // There are a lot of blank lines between the cells.
    if data.is_empty() {
        return Ok(state);
    }
    let Some(course) = state.pending.as_mut() else {
        return Ok(state);
    };

    let Some(title) = course.title.as_deref() else {
        debug!("Reading course title: \"{}\"", data);
        course.title = Some(data.to_string());
        return Ok(state);
    };

    if course.description.is_none() {
        if data != LEVELS_MARKER {
            debug!("Reading course description: \"{}\"", data);
            course.description = Some(data.to_string());
            return Ok(state);
        }
        warn!(
            "The course \"{}\" doesn't seem to have a description. Leaving empty.",
            title
        );
        course.description = Some(String::new());
    }

    if data == LEVELS_MARKER {
        debug!("Preparing to read course levels.");
        state.awaiting_levels = true;
        return Ok(state);
    }

    if state.awaiting_levels {
        debug!("Reading course levels: \"{}\".", data);
        course.levels = Level::parse_list(data)?;
        state.awaiting_levels = false;
        return Ok(state);
    }

    Err(CatalogError::UnexpectedText {
        tag: state.last_tag.clone(),
        text: data.to_string(),
    })
}
