//! Filter, sort and calculation condition enums.
//!
//! Conditions are stored in the CRDT as plain integers. Every enum here
//! carries explicit discriminants and goes through the same
//! `from_i64`/`as_i64` pair, so the numeric encoding rule lives in exactly
//! one place (the `numeric_enum!` macro) instead of ad-hoc conversions at
//! each call site.

use serde::{Deserialize, Serialize};

macro_rules! numeric_enum {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident {
            $($(#[$vmeta:meta])* $variant:ident = $value:literal),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        $vis enum $name {
            $($(#[$vmeta])* $variant = $value),+
        }

        impl $name {
            pub fn from_i64(value: i64) -> Option<Self> {
                match value {
                    $($value => Some(Self::$variant),)+
                    _ => None,
                }
            }

            pub fn as_i64(self) -> i64 {
                self as i64
            }
        }

        impl From<$name> for i64 {
            fn from(value: $name) -> i64 {
                value as i64
            }
        }
    };
}

numeric_enum! {
    /// Kind of a filter tree node: a leaf predicate or an And/Or combinator
    /// over child filters.
    pub enum FilterKind {
        Data = 0,
        And = 1,
        Or = 2,
    }
}

numeric_enum! {
    /// Conditions for RichText, URL and Rollup fields.
    pub enum TextCondition {
        Is = 0,
        IsNot = 1,
        Contains = 2,
        DoesNotContain = 3,
        StartsWith = 4,
        EndsWith = 5,
        IsEmpty = 6,
        IsNotEmpty = 7,
    }
}

numeric_enum! {
    pub enum NumberCondition {
        Equal = 0,
        NotEqual = 1,
        GreaterThan = 2,
        LessThan = 3,
        GreaterThanOrEqualTo = 4,
        LessThanOrEqualTo = 5,
        IsEmpty = 6,
        IsNotEmpty = 7,
    }
}

numeric_enum! {
    pub enum CheckboxCondition {
        IsChecked = 0,
        IsUnChecked = 1,
    }
}

numeric_enum! {
    /// Checklist completion: complete means the completion percentage is
    /// exactly 1.0.
    pub enum ChecklistCondition {
        IsComplete = 0,
        IsIncomplete = 1,
    }
}

numeric_enum! {
    /// Conditions for SingleSelect and MultiSelect fields. The filter
    /// content is a comma-separated list of option ids.
    pub enum SelectCondition {
        OptionIs = 0,
        OptionIsNot = 1,
        OptionContains = 2,
        OptionDoesNotContain = 3,
        OptionIsEmpty = 4,
        OptionIsNotEmpty = 5,
    }
}

numeric_enum! {
    /// Temporal conditions for DateTime, CreatedTime and LastEditedTime
    /// fields. "On" comparisons use same-calendar-day equality, never exact
    /// timestamps.
    pub enum DateCondition {
        DateStartsOn = 0,
        DateStartsBefore = 1,
        DateStartsAfter = 2,
        DateStartsOnOrBefore = 3,
        DateStartsOnOrAfter = 4,
        DateStartsBetween = 5,
        DateStartIsEmpty = 6,
        DateStartIsNotEmpty = 7,
        DateEndsOn = 8,
        DateEndsBefore = 9,
        DateEndsAfter = 10,
        DateEndsOnOrBefore = 11,
        DateEndsOnOrAfter = 12,
        DateEndsBetween = 13,
    }
}

numeric_enum! {
    /// Conditions for Relation fields. Legacy documents stored text
    /// emptiness conditions (6/7); the filter engine normalizes those onto
    /// IsEmpty/IsNotEmpty before evaluation.
    pub enum RelationCondition {
        Contains = 0,
        DoesNotContain = 1,
        IsEmpty = 2,
        IsNotEmpty = 3,
    }
}

numeric_enum! {
    /// Conditions for Person fields (JSON array of user ids in the cell).
    pub enum PersonCondition {
        Contains = 0,
        DoesNotContain = 1,
        IsEmpty = 2,
        IsNotEmpty = 3,
    }
}

numeric_enum! {
    pub enum SortCondition {
        Ascending = 0,
        Descending = 1,
    }
}

numeric_enum! {
    /// Per-field column aggregate shown at the foot of a column.
    pub enum CalculationType {
        Average = 0,
        Max = 1,
        Median = 2,
        Min = 3,
        Sum = 4,
        Count = 5,
        CountEmpty = 6,
        CountNonEmpty = 7,
    }
}
