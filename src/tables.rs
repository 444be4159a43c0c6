//! Record tables exposed through the generic CRUD handlers
//!
//! Every table is scoped by `user_id`. A [`TableSpec`] says which operations a
//! path supports, which fields a POST must carry and how the inserted record is
//! shaped; the handlers in `handlers::records` do the rest.

use serde_json::{Map, Value};

use crate::store::Row;

/// Column holding the owner id on every record table
pub const OWNER_COLUMN: &str = "user_id";

/// Operations a table path accepts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ops {
    pub list: bool,
    pub create: bool,
    pub update: bool,
    pub delete: bool,
}

impl Ops {
    const ALL: Ops = Ops {
        list: true,
        create: true,
        update: true,
        delete: true,
    };
    const LIST_CREATE: Ops = Ops {
        list: true,
        create: true,
        update: false,
        delete: false,
    };
    const NO_DELETE: Ops = Ops {
        list: true,
        create: true,
        update: true,
        delete: false,
    };
    const NO_UPDATE: Ops = Ops {
        list: true,
        create: true,
        update: false,
        delete: true,
    };
    const LIST_UPDATE: Ops = Ops {
        list: true,
        create: false,
        update: true,
        delete: false,
    };
}

/// How GET returns rows
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fetch {
    /// All of the owner's rows as an array
    Many,
    /// Exactly one row; none is a 404
    Single,
}

/// Value used when a picked field is absent from the body
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldDefault {
    Null,
    Str(&'static str),
    Bool(bool),
    Int(i64),
}

impl FieldDefault {
    fn to_value(self) -> Value {
        match self {
            FieldDefault::Null => Value::Null,
            FieldDefault::Str(s) => Value::String(s.to_string()),
            FieldDefault::Bool(b) => Value::Bool(b),
            FieldDefault::Int(n) => Value::from(n),
        }
    }
}

/// One column of a picked insert shape
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Field {
    /// Column written to the table
    pub column: &'static str,
    /// Body key read from the request (the app sends some keys in camelCase)
    pub source: &'static str,
    pub default: FieldDefault,
}

const fn field(column: &'static str) -> Field {
    Field {
        column,
        source: column,
        default: FieldDefault::Null,
    }
}

const fn renamed(column: &'static str, source: &'static str, default: FieldDefault) -> Field {
    Field {
        column,
        source,
        default,
    }
}

const fn defaulted(column: &'static str, default: FieldDefault) -> Field {
    Field {
        column,
        source: column,
        default,
    }
}

/// How a POST body becomes the inserted record
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InsertShape {
    /// Every body field is stored as sent
    PassThrough,
    /// Only the listed fields are stored, with defaults for absent ones
    Picked(&'static [Field]),
}

/// Description of one record table and its HTTP surface
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TableSpec {
    /// URL path segment, e.g. `weight-logs`
    pub path: &'static str,
    /// Table name in the store
    pub table: &'static str,
    /// Response key for GET
    pub collection_key: &'static str,
    /// Response key for a single created/updated row
    pub item_key: &'static str,
    /// Human label used in response messages, e.g. `Weight log`
    pub label: &'static str,
    /// Fields required on POST besides `user_id`
    pub required: &'static [&'static str],
    pub insert: InsertShape,
    /// Column GET sorts ascending by
    pub order_by: Option<&'static str>,
    pub fetch: Fetch,
    pub ops: Ops,
}

impl TableSpec {
    pub fn added_message(&self) -> String {
        // goals answer with a longer message than the other tables
        if self.table == "goals" {
            return "Goal added successfully!".to_string();
        }
        format!("{} added!", self.label)
    }

    pub fn updated_message(&self) -> String {
        format!("{} updated!", self.label)
    }

    pub fn deleted_message(&self) -> String {
        format!("{} deleted!", self.label)
    }

    /// Shape the record inserted for `body`, stamped with `owner_id`
    ///
    /// Any client-supplied `user_id` is replaced by the validated owner id.
    pub fn build_record(&self, body: &Map<String, Value>, owner_id: &str) -> Row {
        let mut record = Row::new();
        record.insert(OWNER_COLUMN.to_string(), Value::String(owner_id.to_string()));

        match self.insert {
            InsertShape::PassThrough => {
                for (key, value) in body {
                    if key != OWNER_COLUMN {
                        record.insert(key.clone(), value.clone());
                    }
                }
            }
            InsertShape::Picked(fields) => {
                for f in fields {
                    let value = match body.get(f.source) {
                        Some(v) if !v.is_null() => v.clone(),
                        _ => f.default.to_value(),
                    };
                    record.insert(f.column.to_string(), value);
                }
            }
        }

        record
    }
}

/// Whether a body value counts as missing for a required field
///
/// Missing, `null`, `false`, zero, empty strings and empty collections are all absent.
pub fn is_blank(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => true,
        Some(Value::Bool(b)) => !b,
        Some(Value::Number(n)) => n.as_f64() == Some(0.0),
        Some(Value::String(s)) => s.is_empty(),
        Some(Value::Array(a)) => a.is_empty(),
        Some(Value::Object(o)) => o.is_empty(),
    }
}

/// Owner id from a JSON body, accepting strings and numbers
pub fn owner_from_body(body: &Map<String, Value>) -> Option<String> {
    body.get(OWNER_COLUMN).and_then(owner_from_value)
}

/// Owner id from a JSON value: a non-empty string, or a number in decimal form
pub fn owner_from_value(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

const GOAL_FIELDS: &[Field] = &[
    field("title"),
    field("description"),
    defaulted("category", FieldDefault::Str("other")),
    renamed("target_date", "targetDate", FieldDefault::Null),
    renamed("is_completed", "isCompleted", FieldDefault::Bool(false)),
    defaulted("progress", FieldDefault::Int(0)),
    field("created"),
];

const PROGRESS_FIELDS: &[Field] = &[
    field("date"),
    field("weight"),
    field("steps"),
    field("nutrition"),
];

const ACHIEVEMENT_FIELDS: &[Field] = &[
    field("name"),
    field("category"),
    field("description"),
    defaulted("is_unlocked", FieldDefault::Bool(false)),
    defaulted("points", FieldDefault::Int(0)),
    field("date_unlocked"),
];

const SAVED_MEAL_FIELDS: &[Field] = &[field("meal_id")];

/// Builds a spec with the common defaults: pass-through inserts, array GET, no ordering
const fn spec(
    path: &'static str,
    table: &'static str,
    item_key: &'static str,
    label: &'static str,
    required: &'static [&'static str],
    ops: Ops,
) -> TableSpec {
    TableSpec {
        path,
        table,
        collection_key: table,
        item_key,
        label,
        required,
        insert: InsertShape::PassThrough,
        order_by: None,
        fetch: Fetch::Many,
        ops,
    }
}

/// Every record table served by the gateway (user profiles are handled separately)
pub static TABLES: &[TableSpec] = &[
    TableSpec {
        insert: InsertShape::Picked(GOAL_FIELDS),
        order_by: Some("created"),
        ..spec("goals", "goals", "goal", "Goal", &["title"], Ops::ALL)
    },
    TableSpec {
        insert: InsertShape::Picked(PROGRESS_FIELDS),
        order_by: Some("date"),
        ..spec("progress", "progress", "entry", "Progress", &["date"], Ops::LIST_CREATE)
    },
    TableSpec {
        insert: InsertShape::Picked(ACHIEVEMENT_FIELDS),
        ..spec(
            "achievements",
            "achievements",
            "achievement",
            "Achievement",
            &["name"],
            Ops::NO_DELETE,
        )
    },
    spec(
        "challenges",
        "challenges",
        "challenge",
        "Challenge",
        &[],
        Ops::LIST_UPDATE,
    ),
    spec("shots", "shots", "shot", "Shot", &["date"], Ops::ALL),
    spec(
        "weight-logs",
        "weight_logs",
        "weight_log",
        "Weight log",
        &["date"],
        Ops::ALL,
    ),
    spec(
        "side-effects",
        "side_effects",
        "side_effect",
        "Side effect",
        &["date"],
        Ops::ALL,
    ),
    spec("meals", "meals", "meal", "Meal", &["date"], Ops::ALL),
    TableSpec {
        insert: InsertShape::Picked(SAVED_MEAL_FIELDS),
        ..spec(
            "saved-meals",
            "saved_meals",
            "saved_meal",
            "Saved meal",
            &["meal_id"],
            Ops::NO_UPDATE,
        )
    },
    spec(
        "water-logs",
        "water_logs",
        "water_log",
        "Water log",
        &["date"],
        Ops::LIST_CREATE,
    ),
    spec(
        "step-logs",
        "step_logs",
        "step_log",
        "Step log",
        &["date"],
        Ops::LIST_CREATE,
    ),
    spec(
        "daily-logs",
        "daily_logs",
        "daily_log",
        "Daily log",
        &["date"],
        Ops::LIST_CREATE,
    ),
    spec(
        "journey-stages",
        "journey_stages",
        "journey_stage",
        "Journey stage",
        &["title"],
        Ops::NO_DELETE,
    ),
    TableSpec {
        fetch: Fetch::Single,
        ..spec("streaks", "streaks", "streaks", "Streaks", &[], Ops::NO_DELETE)
    },
];

/// Look up a table by its URL path segment
pub fn find(path: &str) -> Option<&'static TableSpec> {
    TABLES.iter().find(|t| t.path == path)
}
