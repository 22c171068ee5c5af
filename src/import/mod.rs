//! Bulk pupil roster import from comma-separated text.

use csv::{ReaderBuilder, Trim};
use serde_json::json;
use tracing::{info, warn};

use crate::db::{Entity, Persistence, Record, StoreError};
use crate::models::{ClassRecord, ImportResult, ImportRow};

/// Downloadable template for the import file.
pub const CSV_TEMPLATE: &str = "Name,Email,Year Group,Class Name\n\
Alex Smith,alex.smith@school.org.uk,Year 4,Year 4 Willow\n\
Priya Patel,priya.patel@school.org.uk,Year 5,Year 5 Oak\n\
Sam Jones,sam.jones@school.org.uk,Reception,Reception Robins\n";

/// Parsed rows plus the number of non-empty data lines that were dropped.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedRoster {
    pub rows: Vec<ImportRow>,
    pub skipped: usize,
}

fn is_header(line: &str) -> bool {
    let lower = line.to_lowercase();
    lower.contains("name") && lower.contains("email")
}

fn clean(field: &str) -> String {
    field.trim().trim_matches(|c| c == '"' || c == '\'').trim().to_string()
}

pub fn parse(raw: &str) -> Vec<ImportRow> {
    parse_roster(raw).rows
}

pub fn parse_roster(raw: &str) -> ParsedRoster {
    let lines: Vec<&str> = raw.lines().filter(|l| !l.trim().is_empty()).collect();
    let has_header = lines.first().map_or(false, |l| is_header(l));
    let data = if has_header { &lines[1..] } else { &lines[..] };
    let first_row = if has_header { 2 } else { 1 };

    // Quotes are literal: they are stripped from each field afterwards, never unescaped.
    let joined = data.join("\n");
    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .quoting(false)
        .trim(Trim::All)
        .from_reader(joined.as_bytes());

    let mut parsed = ParsedRoster::default();
    for (index, record) in reader.records().enumerate() {
        let fields: Vec<String> = match record {
            Ok(record) => record.iter().map(clean).collect(),
            Err(e) => {
                warn!("Skipping unreadable roster line {}: {}", index + first_row, e);
                parsed.skipped += 1;
                continue;
            }
        };
        let field = |i: usize| fields.get(i).cloned().unwrap_or_default();
        let non_empty = fields.iter().filter(|f| !f.is_empty()).count();

        let row = ImportRow {
            name: field(0),
            email: field(1),
            year_group: field(2),
            class_name: field(3),
            original_row: index + first_row,
        };
        if non_empty < 2 || row.name.is_empty() || row.email.is_empty() {
            parsed.skipped += 1;
            continue;
        }
        parsed.rows.push(row);
    }
    parsed
}

pub fn class_from_record(record: &Record) -> ClassRecord {
    ClassRecord {
        id: record.id.clone(),
        name: record.str_field("name").unwrap_or_default().to_string(),
        year_group: record.str_field("year_group").unwrap_or_default().to_string(),
        pupil_count: record
            .data
            .get("pupil_count")
            .and_then(|v| v.as_u64())
            .unwrap_or(0) as u32,
    }
}

/// First class whose name contains the hint, else the first in the same year group.
pub fn match_class<'a>(row: &ImportRow, classes: &'a [ClassRecord]) -> Option<&'a ClassRecord> {
    let hint = row.class_name.to_lowercase();
    let by_name = (!hint.is_empty())
        .then(|| classes.iter().find(|c| c.name.to_lowercase().contains(&hint)))
        .flatten();
    by_name.or_else(|| {
        (!row.year_group.is_empty())
            .then(|| classes.iter().find(|c| c.year_group == row.year_group))
            .flatten()
    })
}

async fn import_row(
    store: &dyn Persistence,
    row: &ImportRow,
    classes: &mut [ClassRecord],
) -> Result<(), StoreError> {
    let class_index = match_class(row, classes)
        .and_then(|matched| classes.iter().position(|c| c.id == matched.id));
    let class_id = class_index.map(|i| classes[i].id.clone());

    let pupil = store
        .create(
            Entity::Users,
            json!({
                "name": row.name,
                "email": row.email,
                "role": "pupil",
                "year_group": row.year_group,
                "class_id": class_id,
            }),
        )
        .await?;

    if let Some(i) = class_index {
        let class = &mut classes[i];
        store
            .create(
                Entity::ClassEnrollments,
                json!({ "class_id": class.id, "pupil_id": pupil.id }),
            )
            .await?;
        class.pupil_count += 1;
        store
            .update(
                Entity::Classes,
                &class.id,
                json!({ "pupil_count": class.pupil_count }),
            )
            .await?;
    }
    Ok(())
}

/// Creates and assigns each pupil in turn. A failing row is recorded and the
/// rest continue; earlier rows are not rolled back.
pub async fn import(
    store: &dyn Persistence,
    rows: &[ImportRow],
    existing_classes: &[ClassRecord],
) -> ImportResult {
    let mut classes = existing_classes.to_vec();
    let mut result = ImportResult::default();

    for row in rows {
        match import_row(store, row, &mut classes).await {
            Ok(()) => result.successful += 1,
            Err(e) => {
                warn!("Import failed for row {} ({}): {}", row.original_row, row.name, e);
                result.failed += 1;
                result.errors.push(format!("{}: {}", row.name, e));
            }
        }
    }

    info!(
        "Roster import finished: {} successful, {} failed",
        result.successful, result.failed
    );
    result
}
