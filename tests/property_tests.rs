/// Property-based tests using proptest
/// Tests invariants and properties that should hold for all inputs
use proptest::prelude::*;
use rust_lead_scoring_api::extraction::extract;
use rust_lead_scoring_api::generator::MessageReply;
use rust_lead_scoring_api::geo::{apply_multiplier, LocationTier};
use rust_lead_scoring_api::scorer::{normalize_score, ScoreReply};

// Property: the location multiplier never raises a score and keeps tier order
proptest! {
    #[test]
    fn multiplier_never_exceeds_base(base in 0u8..=100) {
        for tier in [LocationTier::Primary, LocationTier::Secondary, LocationTier::Other] {
            prop_assert!(apply_multiplier(base, tier) <= base);
        }
        prop_assert_eq!(apply_multiplier(base, LocationTier::Primary), base);
    }

    #[test]
    fn tiers_are_ordered(base in 0u8..=100) {
        let primary = apply_multiplier(base, LocationTier::Primary);
        let secondary = apply_multiplier(base, LocationTier::Secondary);
        let other = apply_multiplier(base, LocationTier::Other);
        prop_assert!(primary >= secondary);
        prop_assert!(secondary >= other);
    }

    #[test]
    fn multiplier_is_monotonic(a in 0u8..=100, b in 0u8..=100) {
        let (low, high) = if a <= b { (a, b) } else { (b, a) };
        for tier in [LocationTier::Primary, LocationTier::Secondary, LocationTier::Other] {
            prop_assert!(apply_multiplier(low, tier) <= apply_multiplier(high, tier));
        }
    }

    #[test]
    fn classify_never_panics(location in "\\PC*") {
        let _ = LocationTier::classify(Some(&location));
    }
}

// Property: scores always land in [0, 100]
proptest! {
    #[test]
    fn normalized_score_in_range(raw in -1.0e6f64..1.0e6) {
        prop_assert!(normalize_score(raw) <= 100);
    }

    #[test]
    fn integral_scores_in_range_are_unchanged(score in 0u8..=100) {
        prop_assert_eq!(normalize_score(f64::from(score)), score);
    }
}

// Property: extraction of arbitrary model text never panics
proptest! {
    #[test]
    fn score_extraction_never_panics(raw in "\\PC*") {
        let _ = extract::<ScoreReply>(&raw);
    }

    #[test]
    fn message_extraction_never_panics(raw in "\\PC*") {
        let _ = extract::<MessageReply>(&raw);
    }

    #[test]
    fn wrapped_score_reply_is_found(
        score in 0u8..=100,
        flag in 0u8..=1,
        prefix in "[a-zA-Z .:]{0,40}",
    ) {
        let raw = format!(
            "{}\n```json\n{{\"SCORE\": {}, \"RESPONSE\": \"ok\", \"SHOULD_CONTACT\": {}}}\n```",
            prefix, score, flag
        );
        let result = extract::<ScoreReply>(&raw).unwrap();
        prop_assert_eq!(result.score, score);
        prop_assert_eq!(result.should_contact, flag);
    }
}
