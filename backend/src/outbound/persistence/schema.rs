//! Diesel table definitions for the PostgreSQL schema.
//!
//! These definitions must match `migrations/` exactly. Regenerate with
//! `diesel print-schema` after changing a migration.

diesel::table! {
    /// Merchants provisioned by the dashboard. Read-only to this service.
    merchants (id) {
        id -> Uuid,
        name -> Text,
        description -> Nullable<Text>,
        logo_url -> Nullable<Text>,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    /// Card holders. Balances live in the ledger, not here.
    customers (id) {
        id -> Uuid,
        name -> Nullable<Text>,
        email -> Nullable<Text>,
        phone -> Nullable<Text>,
        created_by_merchant_id -> Uuid,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    /// Physical NFC cards; `uid` is unique.
    cards (id) {
        id -> Uuid,
        /// Normalised upper-case card UID (max 64 characters).
        uid -> Varchar,
        customer_id -> Uuid,
        issuing_merchant_id -> Uuid,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    /// Scoping record between a card and a merchant. Unique per pair.
    card_merchants (id) {
        id -> Uuid,
        card_id -> Uuid,
        merchant_id -> Uuid,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    /// Append-only signed ledger entries.
    transactions (id) {
        id -> Uuid,
        card_merchant_id -> Uuid,
        /// Non-zero signed points.
        points -> Int8,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    /// Merchant-defined milestone journeys.
    checkpoint_offers (id) {
        id -> Uuid,
        merchant_id -> Uuid,
        name -> Text,
        description -> Nullable<Text>,
        total_steps -> Int4,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    /// Rewards attachable to checkpoint steps.
    checkpoint_rewards (id) {
        id -> Uuid,
        merchant_id -> Uuid,
        name -> Text,
        description -> Nullable<Text>,
        icon -> Nullable<Text>,
    }
}

diesel::table! {
    /// Numbered milestones; `reward_id` is nulled when the reward is deleted.
    checkpoint_steps (id) {
        id -> Uuid,
        offer_id -> Uuid,
        step_number -> Int4,
        reward_id -> Nullable<Uuid>,
    }
}

diesel::table! {
    /// Per-customer cursor keyed by (customer, merchant, offer).
    customer_checkpoints (customer_id, merchant_id, offer_id) {
        customer_id -> Uuid,
        merchant_id -> Uuid,
        offer_id -> Uuid,
        current_step -> Int4,
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    /// Audit trail written on every advance.
    checkpoint_advancements (id) {
        id -> Uuid,
        customer_id -> Uuid,
        merchant_id -> Uuid,
        offer_id -> Uuid,
        step_reached -> Int4,
        total_steps -> Int4,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    /// Points-priced rewards.
    rewards (id) {
        id -> Uuid,
        merchant_id -> Uuid,
        name -> Text,
        description -> Nullable<Text>,
        price_coins -> Int4,
        is_active -> Bool,
    }
}

diesel::table! {
    /// Points redemptions; `(merchant_id, idempotency_key)` is unique.
    redeemed_rewards (id) {
        id -> Uuid,
        customer_id -> Uuid,
        merchant_id -> Uuid,
        reward_id -> Uuid,
        points_spent -> Int4,
        status -> Text,
        transaction_id -> Uuid,
        idempotency_key -> Nullable<Varchar>,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    /// Milestone reward claims. No ledger debit.
    redeemed_checkpoint_rewards (id) {
        id -> Uuid,
        customer_id -> Uuid,
        merchant_id -> Uuid,
        reward_id -> Uuid,
        step_id -> Uuid,
        status -> Text,
        created_at -> Timestamptz,
    }
}

diesel::joinable!(cards -> customers (customer_id));
diesel::joinable!(card_merchants -> cards (card_id));
diesel::joinable!(card_merchants -> merchants (merchant_id));
diesel::joinable!(transactions -> card_merchants (card_merchant_id));
diesel::joinable!(checkpoint_steps -> checkpoint_offers (offer_id));

diesel::allow_tables_to_appear_in_same_query!(
    merchants,
    customers,
    cards,
    card_merchants,
    transactions,
    checkpoint_offers,
    checkpoint_rewards,
    checkpoint_steps,
    customer_checkpoints,
    checkpoint_advancements,
    rewards,
    redeemed_rewards,
    redeemed_checkpoint_rewards,
);
