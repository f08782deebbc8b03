//! Property-based tests for the state machine
//!
//! These tests verify key invariants hold across all possible inputs.

use super::state::*;
use super::transition::*;
use super::*;
use chrono::{TimeZone, Utc};
use proptest::prelude::*;

// ============================================================================
// Arbitrary Generators
// ============================================================================

fn arb_echo_input() -> impl Strategy<Value = EchoInput> {
    prop_oneof![
        Just(EchoInput::Absent),
        "[ \t]{0,4}".prop_map(EchoInput::Present),
        ".{1,40}".prop_map(EchoInput::Present),
    ]
}

fn arb_operation() -> impl Strategy<Value = Operation> {
    prop_oneof![
        arb_echo_input().prop_map(|input| Operation::Echo { input }),
        Just(Operation::History),
        Just(Operation::DeleteHistory),
        Just(Operation::Cancel),
    ]
}

fn arb_turn() -> impl Strategy<Value = Turn> {
    (
        proptest::option::of(".{0,30}"),
        ".{1,40}",
        0i64..4_000_000_000,
        0u32..1_000_000_000,
        "[a-z0-9-]{1,16}",
    )
        .prop_map(|(input, output, secs, nanos, actor_id)| Turn {
            input,
            output,
            timestamp: Utc.timestamp_opt(secs, nanos).unwrap(),
            actor_id,
        })
}

// ============================================================================
// Properties
// ============================================================================

proptest! {
    /// Once cancelled, a live actor never becomes active again, and every
    /// non-cancel operation afterwards short-circuits.
    #[test]
    fn cancelled_is_absorbing(ops in proptest::collection::vec(arb_operation(), 0..40)) {
        let mut status = ActorStatus::Active;
        let mut seen_cancel = false;

        for op in ops {
            let is_cancel = matches!(op, Operation::Cancel);
            let result = transition(status, op);

            if is_cancel {
                seen_cancel = true;
                prop_assert_eq!(&result.action, &Action::Acknowledge);
            } else if seen_cancel {
                prop_assert_eq!(&result.action, &Action::ShortCircuit);
            } else {
                prop_assert_ne!(&result.action, &Action::ShortCircuit);
            }

            prop_assert_eq!(result.new_status.is_cancelled(), seen_cancel);
            status = result.new_status;
        }
    }

    /// Output is never empty and always contains meaningful input verbatim
    #[test]
    fn echo_output_is_deterministic(input in arb_echo_input()) {
        let (stored, output) = echo_output(&input);
        let (stored_again, output_again) = echo_output(&input);

        prop_assert!(!output.is_empty());
        prop_assert_eq!(&stored, &stored_again);
        prop_assert_eq!(&output, &output_again);

        match input.meaningful() {
            Some(text) => {
                prop_assert!(output.contains(text));
                prop_assert_eq!(stored.as_deref(), Some(text));
            }
            None => {
                prop_assert_eq!(output.as_str(), NO_INPUT_MESSAGE);
                prop_assert!(stored.is_none());
            }
        }
    }

    /// A stored history decodes to exactly what was encoded
    #[test]
    fn history_round_trips(history in proptest::collection::vec(arb_turn(), 0..8)) {
        let encoded = encode_history(&history).unwrap();
        let decoded = decode_history(&encoded).unwrap();
        prop_assert_eq!(decoded, history);
    }

    /// The current/past envelope round-trips through JSON
    #[test]
    fn echo_response_round_trips(
        current in arb_turn(),
        past in proptest::collection::vec(arb_turn(), 0..5),
    ) {
        let response = EchoResponse { current, past };
        let json = serde_json::to_string(&response).unwrap();
        let decoded: EchoResponse = serde_json::from_str(&json).unwrap();
        prop_assert_eq!(decoded, response);
    }
}
