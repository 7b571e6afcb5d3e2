diesel::table! {
    counter (id) {
        id -> Int4,
        count -> Int4,
        updated_at -> Timestamptz,
    }
}
