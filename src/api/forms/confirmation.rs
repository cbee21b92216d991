use serde::{Deserialize, Serialize};

use super::{Field, FieldKind, FormModel, Schema};

pub static SCHEMA: Schema = Schema {
    fields: &[Field::new("confirmbox", "Yes, delete this", FieldKind::Boolean)],
    checks: &[],
};

/// Second step of a delete: nothing is removed unless the box is ticked.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Confirmation {
    pub confirmbox: bool,
}

impl FormModel for Confirmation {
    fn schema() -> &'static Schema {
        &SCHEMA
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::forms::FormValues;

    #[test]
    fn unticked_box_does_not_confirm() {
        let submitted = FormValues::default();
        assert!(matches!(
            Confirmation::from_values(&submitted),
            Ok(Confirmation { confirmbox: false })
        ));
    }

    #[test]
    fn ticked_box_confirms() {
        let submitted: FormValues = [("confirmbox", "y")].into_iter().collect();
        assert!(matches!(
            Confirmation::from_values(&submitted),
            Ok(Confirmation { confirmbox: true })
        ));
    }
}
