//! View snapshot types.
//!
//! A view is one query/visual configuration over the shared fields and
//! rows. Field order and row order are per-view; nothing else in the
//! document stores column order.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::settings::{Calculation, Filter, GroupSetting, Sort};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ViewLayout {
    Grid = 0,
    Board = 1,
    Calendar = 2,
}

impl ViewLayout {
    pub fn from_i64(value: i64) -> Option<Self> {
        match value {
            0 => Some(ViewLayout::Grid),
            1 => Some(ViewLayout::Board),
            2 => Some(ViewLayout::Calendar),
            _ => None,
        }
    }

    pub fn as_i64(self) -> i64 {
        self as i64
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FieldVisibility {
    AlwaysShown = 0,
    HideWhenEmpty = 1,
    AlwaysHidden = 2,
}

impl FieldVisibility {
    pub fn from_i64(value: i64) -> Option<Self> {
        match value {
            0 => Some(FieldVisibility::AlwaysShown),
            1 => Some(FieldVisibility::HideWhenEmpty),
            2 => Some(FieldVisibility::AlwaysHidden),
            _ => None,
        }
    }

    pub fn as_i64(self) -> i64 {
        self as i64
    }
}

pub const DEFAULT_FIELD_WIDTH: i64 = 150;

/// Per-field presentation settings within one view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSetting {
    pub visibility: FieldVisibility,
    pub width: i64,
    pub wrap: bool,
}

impl Default for FieldSetting {
    fn default() -> Self {
        Self {
            visibility: FieldVisibility::AlwaysShown,
            width: DEFAULT_FIELD_WIDTH,
            wrap: false,
        }
    }
}

/// Board-specific layout settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoardLayoutSetting {
    #[serde(default)]
    pub hide_ungrouped_column: bool,
    #[serde(default)]
    pub collapsed_group_ids: Vec<String>,
}

/// Calendar-specific layout settings. `field_id` binds the calendar to a
/// DateTime field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarLayoutSetting {
    pub field_id: String,
    #[serde(default)]
    pub first_day_of_week: i64,
    #[serde(default = "default_true")]
    pub show_weekends: bool,
    #[serde(default)]
    pub show_week_numbers: bool,
}

fn default_true() -> bool {
    true
}

impl CalendarLayoutSetting {
    pub fn new(field_id: impl Into<String>) -> Self {
        Self {
            field_id: field_id.into(),
            first_day_of_week: 0,
            show_weekends: true,
            show_week_numbers: false,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayoutSettings {
    #[serde(default)]
    pub board: Option<BoardLayoutSetting>,
    #[serde(default)]
    pub calendar: Option<CalendarLayoutSetting>,
}

/// Decoded snapshot of one view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct View {
    pub id: String,
    pub name: String,
    pub layout: ViewLayout,
    pub field_orders: Vec<String>,
    pub row_orders: Vec<String>,
    #[serde(default)]
    pub filters: Vec<Filter>,
    #[serde(default)]
    pub sorts: Vec<Sort>,
    #[serde(default)]
    pub groups: Vec<GroupSetting>,
    #[serde(default)]
    pub calculations: Vec<Calculation>,
    #[serde(default)]
    pub field_settings: HashMap<String, FieldSetting>,
    #[serde(default)]
    pub layout_settings: LayoutSettings,
}

impl View {
    pub fn new(id: impl Into<String>, name: impl Into<String>, layout: ViewLayout) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            layout,
            field_orders: Vec::new(),
            row_orders: Vec::new(),
            filters: Vec::new(),
            sorts: Vec::new(),
            groups: Vec::new(),
            calculations: Vec::new(),
            field_settings: HashMap::new(),
            layout_settings: LayoutSettings::default(),
        }
    }
}
