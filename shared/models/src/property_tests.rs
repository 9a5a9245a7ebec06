//! Property-based tests for the Torvan domain models
//!
//! Universal properties of the workflow state machine, tolerance bands and
//! procurement summaries.

use proptest::prelude::*;
use chrono::{DateTime, Duration, TimeZone, Utc};

use crate::{
    BasinType, ProcurementItem, ProcurementSource, ProcurementStatus, ProcurementSummary,
    Tolerance, WorkflowStage, WorkflowState,
};

prop_compose! {
    fn arb_datetime()(timestamp in 0i64..2147483647i64) -> DateTime<Utc> {
        Utc.timestamp_opt(timestamp, 0).unwrap()
    }
}

fn arb_stage() -> impl Strategy<Value = WorkflowStage> {
    (0..WorkflowStage::ALL.len()).prop_map(|i| WorkflowStage::ALL[i])
}

fn arb_status() -> impl Strategy<Value = ProcurementStatus> {
    prop_oneof![
        Just(ProcurementStatus::Pending),
        Just(ProcurementStatus::Sent),
        Just(ProcurementStatus::Received),
    ]
}

prop_compose! {
    fn arb_procurement_item()(
        part_number in "T2-[A-Z0-9]{2,8}-KIT",
        quantity in 1..8u32,
        status in arb_status()
    ) -> ProcurementItem {
        ProcurementItem {
            part_number,
            name: None,
            category: None,
            quantity,
            source: ProcurementSource::SingleSourceOfTruth,
            status,
            sent_at: None,
            received_at: None,
            assignee: None,
            notes: None,
        }
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// Stage never decreases and milestones are never rewritten, whatever
    /// order stages are advanced in.
    #[test]
    fn prop_workflow_stage_is_monotonic(
        start in arb_datetime(),
        stages in prop::collection::vec(arb_stage(), 1..30)
    ) {
        let mut state = WorkflowState::new(start);
        let mut first_seen = std::collections::BTreeMap::new();
        first_seen.insert(WorkflowStage::OrderCreated, start);

        for (i, stage) in stages.iter().enumerate() {
            let previous = state.current_stage;
            let now = start + Duration::seconds(i as i64 + 1);
            state.advance(*stage, None, now);
            first_seen.entry(*stage).or_insert(now);

            prop_assert!(state.current_stage >= previous);
            for (recorded, at) in &first_seen {
                prop_assert_eq!(state.milestone(*recorded), Some(*at));
            }
        }

        let max_stage = stages.iter().copied().max().unwrap().max(WorkflowStage::OrderCreated);
        prop_assert_eq!(state.current_stage, max_stage);
    }

    #[test]
    fn prop_tolerance_bounds_are_ordered(
        reference in -100.0..200.0f64,
        delta in -10.0..10.0f64
    ) {
        let band = Tolerance::around("°C", reference, delta).unwrap();
        prop_assert!(band.min_value <= band.max_value);
        prop_assert!(band.contains(reference));
    }

    #[test]
    fn prop_procurement_summary_counts_every_item(
        items in prop::collection::vec(arb_procurement_item(), 0..20)
    ) {
        let summary = ProcurementSummary::from_items(&items);
        prop_assert_eq!(summary.total, items.len());
        prop_assert_eq!(summary.pending + summary.sent + summary.received, summary.total);
    }

    #[test]
    fn prop_basin_type_string_round_trip(raw in "[A-Za-z_ -]{1,12}") {
        let parsed = BasinType::parse(&raw);
        let reparsed = BasinType::parse(parsed.as_str());
        prop_assert_eq!(parsed, reparsed);
    }
}
