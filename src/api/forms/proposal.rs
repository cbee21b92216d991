use super::{Field, FieldKind, FormModel, Schema};
use crate::store::ProposalFields;

pub const CATEGORIES: &[&str] = &[
    "Ambassadors",
    "ARM",
    "Cloud",
    "Community",
    "Design",
    "Desktop",
    "Fonts",
    "Games",
    "Hardware",
    "Infrastructure",
    "Kernel",
    "Marketing",
    "QA",
    "Security",
    "SIG",
    "Other",
];

pub const SESSION_TYPES: &[&str] = &["Talk (45 min)", "Workshop (2 hours)"];

pub static SCHEMA: Schema = Schema {
    fields: &[
        Field::new("username", "Username", FieldKind::Text),
        Field::new("title", "Presentation title", FieldKind::Text).required(),
        Field::new("category", "Category", FieldKind::Select(CATEGORIES)),
        Field::new("session_type", "Type", FieldKind::Select(SESSION_TYPES)),
        Field::new("abstract", "Presentation abstract", FieldKind::TextArea).required(),
    ],
    checks: &[],
};

impl FormModel for ProposalFields {
    fn schema() -> &'static Schema {
        &SCHEMA
    }
}
