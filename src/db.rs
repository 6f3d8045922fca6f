use std::path::Path;

use anyhow::{Context, Result};
use rusqlite::Connection;

use crate::course::Course;

pub fn connect(path: &Path) -> Result<Connection> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create {}", dir.display()))?;
    }
    let conn = Connection::open(path)?;
    conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;
    Ok(conn)
}

pub fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS courses (
            id          INTEGER PRIMARY KEY,
            position    INTEGER UNIQUE NOT NULL,
            subject     TEXT,
            number      TEXT,
            title       TEXT NOT NULL,
            description TEXT,
            levels      TEXT NOT NULL DEFAULT '',
            created_at  TEXT NOT NULL DEFAULT (datetime('now'))
        );
        CREATE INDEX IF NOT EXISTS idx_courses_code ON courses(subject, number);

        CREATE TABLE IF NOT EXISTS course_prereqs (
            id          INTEGER PRIMARY KEY,
            course_id   INTEGER NOT NULL REFERENCES courses(id) ON DELETE CASCADE,
            position    INTEGER NOT NULL,
            subject     TEXT NOT NULL,
            number      TEXT NOT NULL,
            UNIQUE(course_id, position)
        );
        CREATE INDEX IF NOT EXISTS idx_prereqs_course ON course_prereqs(course_id);
        CREATE INDEX IF NOT EXISTS idx_prereqs_code ON course_prereqs(subject, number);
        ",
    )?;
    Ok(())
}

/// Replace the stored catalog with `courses`, keeping document order.
pub fn save_courses(conn: &Connection, courses: &[Course]) -> Result<usize> {
    let tx = conn.unchecked_transaction()?;
    let mut count = 0;
    {
        tx.execute("DELETE FROM course_prereqs", [])?;
        tx.execute("DELETE FROM courses", [])?;

        let mut c_stmt = tx.prepare(
            "INSERT INTO courses (position, subject, number, title, description, levels)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        )?;
        let mut p_stmt = tx.prepare(
            "INSERT INTO course_prereqs (course_id, position, subject, number)
             VALUES (?1, ?2, ?3, ?4)",
        )?;

        for (pos, c) in courses.iter().enumerate() {
            let levels = c
                .levels
                .iter()
                .map(|l| l.name())
                .collect::<Vec<_>>()
                .join(", ");
            count += c_stmt.execute(rusqlite::params![
                pos, c.subject, c.number, c.title, c.description, levels,
            ])?;
            let course_id = tx.last_insert_rowid();

            for (ppos, p) in c.prereqs.iter().enumerate() {
                p_stmt.execute(rusqlite::params![course_id, ppos, p.subject, p.number])?;
            }
        }
    }
    tx.commit()?;
    Ok(count)
}

#[allow(dead_code)]
pub struct CourseRow {
    pub subject: Option<String>,
    pub number: Option<String>,
    pub title: String,
    pub description: Option<String>,
    pub levels: String,
}

#[allow(dead_code)]
pub fn fetch_courses(conn: &Connection) -> Result<Vec<CourseRow>> {
    let mut stmt = conn.prepare(
        "SELECT subject, number, title, description, levels FROM courses ORDER BY position",
    )?;
    let rows = stmt
        .query_map([], |row| {
            Ok(CourseRow {
                subject: row.get(0)?,
                number: row.get(1)?,
                title: row.get(2)?,
                description: row.get(3)?,
                levels: row.get(4)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// `(subject, number)` prerequisites of the course at `position`, in order.
#[allow(dead_code)]
pub fn fetch_prereqs(conn: &Connection, position: usize) -> Result<Vec<(String, String)>> {
    let mut stmt = conn.prepare(
        "SELECT p.subject, p.number
         FROM course_prereqs p
         JOIN courses c ON c.id = p.course_id
         WHERE c.position = ?1
         ORDER BY p.position",
    )?;
    let rows = stmt
        .query_map([position], |row| Ok((row.get(0)?, row.get(1)?)))?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::course::{Level, Prereq};

    fn memory() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch("PRAGMA foreign_keys=ON;").unwrap();
        init_schema(&conn).unwrap();
        conn
    }

    fn course(title: &str, prereqs: Vec<Prereq>) -> Course {
        Course {
            title: Some(title.into()),
            description: Some("desc".into()),
            levels: vec![Level::Undergraduate, Level::Graduate],
            subject: Some("CS".into()),
            number: Some("240".into()),
            prereqs,
        }
    }

    #[test]
    fn save_and_fetch() {
        let conn = memory();
        let courses = vec![
            course("Intro", vec![]),
            course("Data Structures", vec![Prereq::new("CS", "140"), Prereq::new("Math", "225")]),
        ];
        assert_eq!(save_courses(&conn, &courses).unwrap(), 2);

        let rows = fetch_courses(&conn).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].title, "Intro");
        assert_eq!(rows[1].levels, "Undergraduate, Graduate");
        assert_eq!(rows[1].subject.as_deref(), Some("CS"));
        assert_eq!(rows[1].description.as_deref(), Some("desc"));

        let prereqs = fetch_prereqs(&conn, 1).unwrap();
        assert_eq!(
            prereqs,
            vec![("CS".to_string(), "140".to_string()), ("Math".to_string(), "225".to_string())]
        );
        assert!(fetch_prereqs(&conn, 0).unwrap().is_empty());
    }

    #[test]
    fn save_replaces_previous_catalog() {
        let conn = memory();
        save_courses(&conn, &[course("Old", vec![Prereq::new("CS", "101")])]).unwrap();
        save_courses(&conn, &[course("New", vec![])]).unwrap();

        let rows = fetch_courses(&conn).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].title, "New");
        let left: usize = conn
            .query_row("SELECT COUNT(*) FROM course_prereqs", [], |r| r.get(0))
            .unwrap();
        assert_eq!(left, 0);
    }

    #[test]
    fn schema_is_idempotent() {
        let conn = memory();
        init_schema(&conn).unwrap();
    }
}
