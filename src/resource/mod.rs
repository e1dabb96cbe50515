//! Field schemas for every catalog resource.

pub mod schema;
pub mod validation;

pub use schema::{FieldError, FieldKind, FieldSpec, Location, Mode, Schema, Validated};

pub const WATCH_STATES: &[&str] = &["want to watch", "watching", "watched"];

const NAME: FieldKind = FieldKind::Text { min: 1, max: 128 };

pub const SERIES: Schema = Schema::new(&[
    FieldSpec::new("name", NAME).required(),
    FieldSpec::new("air_date", FieldKind::Date)
        .aliases(&["airDate"])
        .nullable(),
    FieldSpec::new("in_production", FieldKind::Boolean)
        .aliases(&["inProduction"])
        .required(),
    FieldSpec::new("tagline", FieldKind::FreeText).nullable(),
    FieldSpec::new("description", FieldKind::FreeText).nullable(),
    FieldSpec::new("language", FieldKind::Text { min: 2, max: 2 }).required(),
    FieldSpec::new("network", FieldKind::FreeText).nullable(),
    FieldSpec::new("homepage", FieldKind::FreeText).nullable(),
]);

pub const SEASON: Schema = Schema::new(&[
    FieldSpec::new("name", NAME).required(),
    FieldSpec::new(
        "number",
        FieldKind::Integer {
            min: Some(0),
            max: None,
        },
    )
    .required(),
    FieldSpec::new("air_date", FieldKind::Date)
        .aliases(&["airDate"])
        .nullable(),
    FieldSpec::new("overview", FieldKind::FreeText).nullable(),
]);

pub const EPISODE: Schema = Schema::new(&[
    FieldSpec::new("name", NAME).required(),
    FieldSpec::new(
        "number",
        FieldKind::Integer {
            min: Some(1),
            max: None,
        },
    )
    .required(),
    FieldSpec::new("air_date", FieldKind::Date)
        .aliases(&["airDate"])
        .nullable(),
    FieldSpec::new("overview", FieldKind::FreeText).nullable(),
]);

pub const GENRE: Schema =
    Schema::new(&[FieldSpec::new("name", FieldKind::Text { min: 1, max: 256 }).required()]);

pub const RATING: Schema = Schema::new(&[FieldSpec::new(
    "rating",
    FieldKind::Integer {
        min: Some(0),
        max: Some(5),
    },
)
.required()]);

pub const STATE: Schema =
    Schema::new(&[FieldSpec::new("state", FieldKind::OneOf(WATCH_STATES)).required()]);

pub const REGISTER: Schema = Schema::new(&[
    FieldSpec::new("username", FieldKind::Verbatim { min: 1, max: 256 }).required(),
    FieldSpec::new("email", FieldKind::Email { max: 256 }).required(),
    FieldSpec::new("password", FieldKind::Verbatim { min: 8, max: 256 }).required(),
]);

pub const LOGIN: Schema = Schema::new(&[
    FieldSpec::new("username", FieldKind::Verbatim { min: 1, max: 256 }).required(),
    FieldSpec::new("password", FieldKind::Verbatim { min: 1, max: 256 }).required(),
]);

/// What a user may change about themselves.
pub const PROFILE: Schema = Schema::new(&[
    FieldSpec::new("email", FieldKind::Email { max: 256 }),
    FieldSpec::new("password", FieldKind::Verbatim { min: 8, max: 256 }),
]);

pub const ADMIN_FLAG: Schema =
    Schema::new(&[FieldSpec::new("admin", FieldKind::Boolean).required()]);
