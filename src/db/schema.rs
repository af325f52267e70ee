// The PostGIS `geog` column of each table is generated by the database and
// is only referenced from raw SQL.

diesel::table! {
    layer_features (id) {
        id -> Int8,
        layer_name -> Text,
        description -> Nullable<Text>,
        feature_id -> Nullable<Jsonb>,
        properties -> Jsonb,
        geometry -> Jsonb,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    user_reports (id) {
        id -> Text,
        location -> Jsonb,
        latitude -> Float8,
        longitude -> Float8,
        report_type -> Text,
        description -> Nullable<Text>,
        date -> Nullable<Text>,
        time -> Nullable<Text>,
        created_at -> Nullable<Timestamptz>,
        status -> Text,
    }
}

diesel::allow_tables_to_appear_in_same_query!(
    layer_features,
    user_reports,
);
