use super::{Field, FieldKind, FormModel, FormValues, Schema};
use crate::store::RegistrationFields;

pub const GENDERS: &[&str] = &["Male", "Female"];
pub const FAMILY: &[&str] = &["No", "1", "2", "3", "4", "5+"];
pub const DIETS: &[&str] = &["No", "Vegan", "Vegetarian"];
pub const SHIRT_SIZES: &[&str] = &["No shirt", "XS", "S", "M", "L", "XL", "2XL", "3XL"];
pub const ROOM_SHARE: &[&str] = &["No", "Yes", FOUND_ROOMMATE];
pub const HOTEL_BOOKED: &[&str] = &["No", "Yes", "No hotel"];

const FOUND_ROOMMATE: &str = "Found roommate";
pub const ROOMMATE_REQUIRED: &str = "This field is required if \"Found roommate\" is selected.";

pub static SCHEMA: Schema = Schema {
    fields: &[
        Field::new("firstname", "First (Given) Name", FieldKind::Text).required(),
        Field::new("middlename", "Middle Name", FieldKind::Text),
        Field::new("lastname", "Last (Family) Name", FieldKind::Text),
        Field::new("email", "Email address", FieldKind::Email).required(),
        Field::new("username", "Username", FieldKind::Text),
        Field::new("location", "Location", FieldKind::Text),
        Field::new(
            "invitation_letter",
            "Do you need an invitation letter to attend?",
            FieldKind::Boolean,
        ),
        Field::new("hotel_funding", "Need hotel funding?", FieldKind::Boolean),
        Field::new("flight_funding", "Need flight funding?", FieldKind::Boolean),
        Field::new("month_of_birth", "Month of Birth", FieldKind::Text),
        Field::new("day_of_birth", "Day of Birth", FieldKind::Text),
        Field::new("year_of_birth", "Year of Birth", FieldKind::Text),
        Field::new("mailing_address", "Mailing Address", FieldKind::TextArea),
        Field::new("phone_number", "Phone Number", FieldKind::Text),
        Field::new("gender", "Gender", FieldKind::Select(GENDERS)),
        Field::new("passport_country", "Passport Country", FieldKind::Text),
        Field::new("passport_number", "Passport Number", FieldKind::Text),
        Field::new("departure_airport", "Preferred Departure Airport", FieldKind::Text),
        Field::new("return_airport", "Preferred Return Airport", FieldKind::Text),
        Field::new(
            "other_notes",
            "Other notes relating to flight subsidy preferences",
            FieldKind::TextArea,
        ),
        Field::new("family", "Bringing family?", FieldKind::Select(FAMILY)),
        Field::new("volunteer", "Willing to be a volunteer?", FieldKind::Boolean),
        Field::new("diet", "Vegan or vegetarian?", FieldKind::Select(DIETS)),
        Field::new("shirt_size", "T-shirt size", FieldKind::Select(SHIRT_SIZES)),
        Field::new("room_share", "Room share", FieldKind::Select(ROOM_SHARE)),
        Field::new("roommate", "Roommate", FieldKind::Text),
        Field::new("hotel_booked", "Hotel booked?", FieldKind::Select(HOTEL_BOOKED)),
        Field::new("blog", "Blog", FieldKind::Text),
        Field::new("twitter", "Twitter", FieldKind::Text),
        Field::new("comments", "Comments", FieldKind::Text),
        Field::new("badge_line", "Extra line on badge", FieldKind::Text),
    ],
    checks: &[roommate_named],
};

fn roommate_named(values: &FormValues) -> Option<(&'static str, &'static str)> {
    (values.get("room_share") == FOUND_ROOMMATE && values.get("roommate").trim().is_empty())
        .then_some(("roommate", ROOMMATE_REQUIRED))
}

impl FormModel for RegistrationFields {
    fn schema() -> &'static Schema {
        &SCHEMA
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::forms::{FIELD_REQUIRED, NOT_A_VALID_CHOICE};

    fn values(pairs: &[(&str, &str)]) -> FormValues {
        pairs.iter().copied().collect()
    }

    #[test]
    fn minimal_submission_is_valid() {
        let mut submitted = values(&[("firstname", "Ana"), ("email", "a@x.org")]);
        assert!(SCHEMA.validate(&mut submitted).is_empty());

        let fields = RegistrationFields::from_values(&submitted);
        let Ok(fields) = fields else {
            panic!("validated values should map to a record");
        };
        assert_eq!(fields.firstname, "Ana");
        assert_eq!(fields.email, "a@x.org");
        assert_eq!(fields.gender, "Male");
        assert_eq!(fields.shirt_size, "No shirt");
        assert!(!fields.volunteer);
    }

    #[test]
    fn firstname_and_email_are_required() {
        let mut submitted = FormValues::default();
        let errors = SCHEMA.validate(&mut submitted);
        assert_eq!(errors.get("firstname"), Some(FIELD_REQUIRED));
        assert_eq!(errors.get("email"), Some(FIELD_REQUIRED));
        assert_eq!(errors.get("lastname"), None);
    }

    #[test]
    fn found_roommate_requires_a_name() {
        let mut submitted = values(&[
            ("firstname", "Ana"),
            ("email", "a@x.org"),
            ("room_share", "Found roommate"),
        ]);
        assert_eq!(
            SCHEMA.validate(&mut submitted).get("roommate"),
            Some(ROOMMATE_REQUIRED)
        );

        submitted.set("roommate", "Bea");
        assert!(SCHEMA.validate(&mut submitted).is_empty());
    }

    #[test]
    fn shirt_size_outside_choices_is_rejected() {
        let mut submitted = values(&[
            ("firstname", "Ana"),
            ("email", "a@x.org"),
            ("shirt_size", "4XL"),
        ]);
        assert_eq!(
            SCHEMA.validate(&mut submitted).get("shirt_size"),
            Some(NOT_A_VALID_CHOICE)
        );
    }

    #[test]
    fn record_round_trips_through_edit_form() {
        let fields = RegistrationFields {
            firstname: "Ana".to_string(),
            email: "a@x.org".to_string(),
            volunteer: true,
            diet: "Vegan".to_string(),
            ..RegistrationFields::default()
        };
        let values = fields.to_values();
        assert_eq!(values.get("firstname"), "Ana");
        assert_eq!(values.get("diet"), "Vegan");
        assert!(values.checked("volunteer"));
        assert!(!values.checked("hotel_funding"));
    }
}
