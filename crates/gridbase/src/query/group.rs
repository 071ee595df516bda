//! Dynamic board-style grouping.
//!
//! Group buckets are derived from field values, not stored raw; the view
//! only persists the grouped field and per-column visibility/order. The
//! ungrouped bucket reuses the field id as its column id.

use chrono::{DateTime, Datelike, NaiveDate, Utc};

use gridbase_api::{Field, FieldType, Row};

use crate::codec;

/// One derived board column with its member rows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupBucket {
    pub id: String,
    pub label: String,
    pub row_ids: Vec<String>,
}

impl GroupBucket {
    fn new(id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            row_ids: Vec::new(),
        }
    }
}

/// Derive the bucket list for grouping by `field`. The last bucket is
/// always the ungrouped column, carrying rows with no groupable value.
pub fn generate_groups(field: &Field, rows: &[Row]) -> Vec<GroupBucket> {
    generate_groups_at(field, rows, Utc::now().date_naive())
}

/// Deterministic variant used by tests; `today` anchors the relative date
/// buckets.
pub fn generate_groups_at(field: &Field, rows: &[Row], today: NaiveDate) -> Vec<GroupBucket> {
    match field.field_type {
        t if t.is_select() => select_buckets(field, rows),
        FieldType::Checkbox => checkbox_buckets(field, rows),
        t if t.is_date_like() => date_buckets(field, rows, today),
        // No grouping semantics; everything lands in the ungrouped column.
        _ => {
            let mut ungrouped = GroupBucket::new(&field.id, "");
            ungrouped.row_ids = rows.iter().map(|r| r.id.clone()).collect();
            vec![ungrouped]
        }
    }
}

/// One column per select option, in option order. A multi-select row
/// appears in every bucket it matches.
fn select_buckets(field: &Field, rows: &[Row]) -> Vec<GroupBucket> {
    let options = codec::select_options(field);
    let mut buckets: Vec<GroupBucket> = options
        .iter()
        .map(|option| GroupBucket::new(&option.id, &option.name))
        .collect();
    let mut ungrouped = GroupBucket::new(&field.id, "");

    for row in rows {
        let selected = row
            .cell(&field.id)
            .map(|cell| codec::select_ids_from_cell(cell, field))
            .unwrap_or_default();
        if selected.is_empty() {
            ungrouped.row_ids.push(row.id.clone());
            continue;
        }
        let mut matched = false;
        for bucket in &mut buckets {
            if selected.contains(&bucket.id) {
                bucket.row_ids.push(row.id.clone());
                matched = true;
            }
        }
        if !matched {
            ungrouped.row_ids.push(row.id.clone());
        }
    }

    buckets.push(ungrouped);
    buckets
}

fn checkbox_buckets(field: &Field, rows: &[Row]) -> Vec<GroupBucket> {
    let mut yes = GroupBucket::new("Yes", "Yes");
    let mut no = GroupBucket::new("No", "No");
    for row in rows {
        let checked = row
            .cell(&field.id)
            .map(|cell| codec::is_checked(cell.data.as_text()))
            .unwrap_or(false);
        if checked {
            yes.row_ids.push(row.id.clone());
        } else {
            no.row_ids.push(row.id.clone());
        }
    }
    vec![yes, no]
}

fn date_buckets(field: &Field, rows: &[Row], today: NaiveDate) -> Vec<GroupBucket> {
    let mut buckets: Vec<GroupBucket> = Vec::new();
    let mut ungrouped = GroupBucket::new(&field.id, "");

    for row in rows {
        let day = row_day(field, row);
        let Some(day) = day else {
            ungrouped.row_ids.push(row.id.clone());
            continue;
        };
        let (id, label) = date_bucket(day, today);
        match buckets.iter_mut().find(|bucket| bucket.id == id) {
            Some(bucket) => bucket.row_ids.push(row.id.clone()),
            None => {
                let mut bucket = GroupBucket::new(id, label);
                bucket.row_ids.push(row.id.clone());
                buckets.push(bucket);
            }
        }
    }

    buckets.push(ungrouped);
    buckets
}

fn row_day(field: &Field, row: &Row) -> Option<NaiveDate> {
    let seconds = match field.field_type {
        FieldType::CreatedTime => Some(row.created_at / 1000),
        FieldType::LastEditedTime => Some(row.last_modified / 1000),
        _ => row
            .cell(&field.id)
            .and_then(|cell| codec::date_cell_value(cell).start),
    }?;
    DateTime::<Utc>::from_timestamp(seconds, 0).map(|dt| dt.date_naive())
}

/// Relative date bucket for one day. Buckets nearer than a month get
/// relative ids; anything further collapses to its calendar month.
pub fn date_bucket(day: NaiveDate, today: NaiveDate) -> (String, String) {
    let delta = (day - today).num_days();
    match delta {
        0 => ("today".into(), "Today".into()),
        -1 => ("yesterday".into(), "Yesterday".into()),
        1 => ("tomorrow".into(), "Tomorrow".into()),
        -7..=-2 => ("last_7_days".into(), "Last 7 days".into()),
        2..=7 => ("next_7_days".into(), "Next 7 days".into()),
        -30..=-8 => ("last_30_days".into(), "Last 30 days".into()),
        8..=30 => ("next_30_days".into(), "Next 30 days".into()),
        _ => (
            format!("{:04}-{:02}", day.year(), day.month()),
            format!("{} {}", month_name(day.month()), day.year()),
        ),
    }
}

fn month_name(month: u32) -> &'static str {
    match month {
        1 => "Jan",
        2 => "Feb",
        3 => "Mar",
        4 => "Apr",
        5 => "May",
        6 => "Jun",
        7 => "Jul",
        8 => "Aug",
        9 => "Sep",
        10 => "Oct",
        11 => "Nov",
        _ => "Dec",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gridbase_api::{Cell, SelectOption, SelectTypeOption};

    #[test]
    fn test_select_buckets_follow_option_order() {
        let mut field = Field::new("s", "Status", FieldType::SingleSelect);
        field.type_options.insert(
            FieldType::SingleSelect.as_i64(),
            serde_json::to_value(SelectTypeOption {
                options: vec![
                    SelectOption {
                        id: "o1".into(),
                        name: "Todo".into(),
                        color: String::new(),
                    },
                    SelectOption {
                        id: "o2".into(),
                        name: "Done".into(),
                        color: String::new(),
                    },
                ],
                disable_color: false,
            })
            .unwrap(),
        );

        let mut done_row = Row::new("r1");
        done_row
            .cells
            .insert("s".into(), Cell::text("o2", FieldType::SingleSelect));
        let empty_row = Row::new("r2");

        let buckets = generate_groups(&field, &[done_row, empty_row]);
        assert_eq!(buckets.len(), 3);
        assert_eq!(buckets[0].id, "o1");
        assert!(buckets[0].row_ids.is_empty());
        assert_eq!(buckets[1].row_ids, ["r1"]);
        // Ungrouped column reuses the field id.
        assert_eq!(buckets[2].id, "s");
        assert_eq!(buckets[2].row_ids, ["r2"]);
    }

    #[test]
    fn test_checkbox_buckets() {
        let field = Field::new("c", "Done", FieldType::Checkbox);
        let mut yes_row = Row::new("r1");
        yes_row
            .cells
            .insert("c".into(), Cell::text("Yes", FieldType::Checkbox));
        let no_row = Row::new("r2");

        let buckets = generate_groups(&field, &[yes_row, no_row]);
        assert_eq!(buckets[0].row_ids, ["r1"]);
        assert_eq!(buckets[1].row_ids, ["r2"]);
    }

    #[test]
    fn test_date_bucket_boundaries() {
        let today = NaiveDate::from_ymd_opt(2024, 3, 15).unwrap();
        assert_eq!(date_bucket(today, today).0, "today");
        assert_eq!(date_bucket(today.pred_opt().unwrap(), today).0, "yesterday");
        assert_eq!(date_bucket(today.succ_opt().unwrap(), today).0, "tomorrow");
        assert_eq!(
            date_bucket(NaiveDate::from_ymd_opt(2024, 3, 10).unwrap(), today).0,
            "last_7_days"
        );
        assert_eq!(
            date_bucket(NaiveDate::from_ymd_opt(2024, 4, 10).unwrap(), today).0,
            "next_30_days"
        );
        let far = NaiveDate::from_ymd_opt(2024, 7, 1).unwrap();
        assert_eq!(date_bucket(far, today), ("2024-07".into(), "Jul 2024".into()));
    }
}
