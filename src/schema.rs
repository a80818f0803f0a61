diesel::table! {
    users (id) {
        id -> Integer,
        messenger_id -> Text,
        gender -> Text,
        preference -> Text,
        photo_url -> Text,
        summary -> Text,
        setup_completed -> Bool,
        created_at -> Timestamp,
        updated_at -> Timestamp,
    }
}

diesel::table! {
    conversation_states (messenger_id) {
        messenger_id -> Text,
        current_step -> Text,
        temp_data -> Text,
        updated_at -> Timestamp,
    }
}

diesel::table! {
    ratings (id) {
        id -> Integer,
        rater_id -> Text,
        person1_id -> Text,
        person2_id -> Text,
        rating -> Bool,
        created_at -> Timestamp,
    }
}

diesel::allow_tables_to_appear_in_same_query!(users, conversation_states, ratings);
