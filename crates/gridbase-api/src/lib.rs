pub mod conditions;
pub mod error;
pub mod field;
pub mod row;
pub mod settings;
pub mod view;

// Re-export entity types
pub use field::{Field, FieldType, SelectOption, SelectTypeOption};

pub use row::{Cell, CellData, ChecklistCellData, Row, RowKey, RowMeta};

pub use view::{
    BoardLayoutSetting, CalendarLayoutSetting, FieldSetting, FieldVisibility, LayoutSettings,
    View, ViewLayout, DEFAULT_FIELD_WIDTH,
};

pub use settings::{Calculation, DateFilterContent, Filter, GroupColumn, GroupSetting, Sort};

pub use conditions::{
    CalculationType, CheckboxCondition, ChecklistCondition, DateCondition, FilterKind,
    NumberCondition, PersonCondition, RelationCondition, SelectCondition, SortCondition,
    TextCondition,
};

pub use error::{DatabaseError, DatabaseResult};
