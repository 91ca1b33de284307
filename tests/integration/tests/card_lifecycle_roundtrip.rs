use relay_card::{
    apply_outcome, extract_modal_comment, normalize_review_request, render_card,
    render_outcome_fallback_text, request_changes_modal, BlockKind, Card, CardAction, CardError,
    ModalContext, OutcomeEvent, RoutingPayload,
};
use relay_card::review_modal::{COMMENT_ACTION_ID, COMMENT_BLOCK_ID};
use serde_json::{json, Value};

fn pull_request_payload(number: u64, draft: bool) -> Value {
    json!({
        "id": 9000 + number,
        "number": number,
        "title": "Teach the parser about raw strings",
        "body": "Raw strings no longer trip the escape handling.",
        "state": "open",
        "draft": draft,
        "merged": false,
        "user": {"login": "octocat", "avatar_url": "https://avatars.example/octocat"},
        "head": {"ref": "raw-strings"},
        "base": {"ref": "main"},
        "html_url": format!("https://github.com/acme/widgets/pull/{number}"),
        "mergeable_state": "clean",
        "additions": 40,
        "deletions": 4,
        "changed_files": 3
    })
}

fn action_value(blocks: &[Value], action: CardAction) -> Option<String> {
    blocks
        .iter()
        .filter(|block| block.get("type").and_then(Value::as_str) == Some("actions"))
        .filter_map(|block| block.get("elements").and_then(Value::as_array))
        .flatten()
        .find(|element| {
            element.get("action_id").and_then(Value::as_str) == Some(action.action_id())
        })
        .and_then(|element| element.get("value").and_then(Value::as_str))
        .map(ToOwned::to_owned)
}

#[test]
fn integration_open_card_survives_slack_persistence_and_records_one_decision() {
    let request = normalize_review_request(&pull_request_payload(42, false)).expect("normalize");
    let card = render_card(&request, "acme", "widgets", 42);
    let posted = card.to_block_kit();

    let routing_text = action_value(&posted, CardAction::Approve).expect("approve button value");
    let routing = RoutingPayload::parse(&routing_text).expect("routing payload");
    assert_eq!(routing, RoutingPayload::new("acme", "widgets", 42));

    let stored = Card::from_block_kit(&posted);
    assert_eq!(stored.kinds(), card.kinds());
    assert!(!stored.is_decided());

    let outcome = OutcomeEvent::Approved {
        actor_name: "Jane Doe".to_string(),
    };
    let decided = apply_outcome(&stored, &outcome).expect("apply approval");
    let updated = decided.to_block_kit();
    assert_eq!(updated.len(), posted.len());
    assert_eq!(updated[0], posted[0]);
    assert_eq!(updated[1], posted[1]);
    assert_eq!(updated[2], posted[2]);
    assert_eq!(updated.last(), posted.last());
    assert!(action_value(&updated, CardAction::Approve).is_none());
    assert_eq!(
        render_outcome_fallback_text(&outcome),
        "GitHub PR approved by Jane Doe"
    );

    let reloaded = Card::from_block_kit(&updated);
    assert!(reloaded.is_decided());
    assert_eq!(
        apply_outcome(&reloaded, &outcome),
        Err(CardError::AlreadyDecided)
    );
}

#[test]
fn integration_request_changes_modal_round_trip_quotes_comment_on_card() {
    let request = normalize_review_request(&pull_request_payload(7, false)).expect("normalize");
    let posted = render_card(&request, "acme", "widgets", 7).to_block_kit();

    let context = ModalContext {
        routing: RoutingPayload::new("acme", "widgets", 7),
        channel_id: "C1".to_string(),
        message_ts: "1700000000.000100".to_string(),
        thread_ts: Some("1700000000.000001".to_string()),
    };
    let view = request_changes_modal(&context);
    let metadata = view
        .get("private_metadata")
        .and_then(Value::as_str)
        .expect("private metadata");
    assert_eq!(
        ModalContext::from_private_metadata(metadata).expect("decode metadata"),
        context
    );

    let input = &view["blocks"][1];
    assert_eq!(input["block_id"], COMMENT_BLOCK_ID);
    assert_eq!(input["element"]["action_id"], COMMENT_ACTION_ID);
    let mut state_values = json!({});
    state_values[COMMENT_BLOCK_ID][COMMENT_ACTION_ID] =
        json!({ "type": "plain_text_input", "value": "  Please add tests  " });
    let comment = extract_modal_comment(&state_values);
    assert_eq!(comment.as_deref(), Some("Please add tests"));

    let decided = apply_outcome(
        &Card::from_block_kit(&posted),
        &OutcomeEvent::ChangesRequested {
            actor_name: "Jane Doe".to_string(),
            comment,
        },
    )
    .expect("apply changes requested");
    let rendered = serde_json::to_string(&decided.to_block_kit()).expect("serialize blocks");
    assert!(rendered.contains("Changes requested by Jane Doe"));
    assert!(rendered.contains("Please add tests"));
    assert_eq!(decided.kinds()[decided.len() - 2], BlockKind::StatusNote);
}

#[test]
fn integration_draft_card_without_controls_grows_by_one_block() {
    let request = normalize_review_request(&pull_request_payload(8, true)).expect("normalize");
    let posted = render_card(&request, "acme", "widgets", 8).to_block_kit();
    assert!(action_value(&posted, CardAction::Approve).is_none());

    let decided = apply_outcome(
        &Card::from_block_kit(&posted),
        &OutcomeEvent::Approved {
            actor_name: "Jane Doe".to_string(),
        },
    )
    .expect("apply approval to draft card");
    assert_eq!(decided.len(), posted.len() + 1);
    assert_eq!(decided.kinds().last(), Some(&BlockKind::Divider));
}
