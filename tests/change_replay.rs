//! Property test: replaying the change log over the session snapshot
//! reconstructs the working copy, for arbitrary edit sequences.

use chrono::NaiveDate;
use proptest::prelude::*;
use rust_decimal::Decimal;

use spendbot::engine::{
    AttrValue, Attributes, DraftId, EditSession, Field, PaymentMethod, UserId,
};

fn base_attrs() -> Attributes {
    Attributes::new()
        .with(Field::Amount, AttrValue::Number(Decimal::from(420)))
        .with(Field::Category, AttrValue::text("food"))
        .with(Field::Merchant, AttrValue::text("cafe"))
}

fn field_for(index: usize) -> Field {
    const FIELDS: [Field; 7] = [
        Field::Amount,
        Field::Category,
        Field::Merchant,
        Field::PaymentMethod,
        Field::Date,
        Field::Notes,
        Field::Confidence,
    ];
    FIELDS[index % FIELDS.len()]
}

/// A plausible value for the field, derived from the seed.
fn value_for(field: Field, seed: u32) -> AttrValue {
    match field {
        Field::Amount => AttrValue::Number(Decimal::new(seed as i64, 2)),
        Field::Category | Field::Merchant | Field::Notes => {
            AttrValue::Text(format!("value-{seed}"))
        }
        Field::PaymentMethod => AttrValue::Payment(match seed % 4 {
            0 => PaymentMethod::Upi,
            1 => PaymentMethod::Cash,
            2 => PaymentMethod::Card,
            _ => PaymentMethod::Online,
        }),
        Field::Date => AttrValue::Date(
            NaiveDate::from_ymd_opt(2026, (seed % 12) + 1, (seed % 28) + 1).unwrap(),
        ),
        Field::Confidence => AttrValue::Score(f64::from(seed % 100) / 100.0),
    }
}

proptest! {
    #[test]
    fn replay_reconstructs_working_copy(
        edits in prop::collection::vec((0usize..7, 0u32..10_000), 0..40)
    ) {
        let mut session = EditSession::new(UserId(1), DraftId::from("exp-1-1"), base_attrs());
        for (index, seed) in &edits {
            let field = field_for(*index);
            session.update_field(field, value_for(field, *seed), "prop edit");
        }

        // One change record per mutation, and the log is a faithful
        // derivation of working from snapshot.
        prop_assert_eq!(session.changes.len(), edits.len());
        prop_assert_eq!(session.replay(), session.working.clone());
        prop_assert_eq!(session.snapshot.clone(), base_attrs());
    }

    #[test]
    fn change_log_old_values_chain(
        seeds in prop::collection::vec(0u32..10_000, 1..20)
    ) {
        // Repeated edits of one field: each record's old value is the
        // previous record's new value.
        let mut session = EditSession::new(UserId(1), DraftId::from("exp-1-1"), base_attrs());
        for seed in &seeds {
            session.update_field(Field::Notes, value_for(Field::Notes, *seed), "prop edit");
        }

        prop_assert_eq!(session.changes[0].old.clone(), None);
        for pair in session.changes.windows(2) {
            prop_assert_eq!(pair[1].old.clone(), Some(pair[0].new.clone()));
        }
    }
}
