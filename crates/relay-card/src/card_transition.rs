use serde::{Deserialize, Serialize};

use crate::{BlockKind, Card, CardBlock, CardError, DecisionKind, StatusNoteBlock};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
/// Review decision made by a reviewer from the chat surface.
pub enum OutcomeEvent {
    Approved {
        actor_name: String,
    },
    ChangesRequested {
        actor_name: String,
        comment: Option<String>,
    },
}

impl OutcomeEvent {
    pub fn actor_name(&self) -> &str {
        match self {
            Self::Approved { actor_name } | Self::ChangesRequested { actor_name, .. } => actor_name,
        }
    }

    pub fn decision(&self) -> DecisionKind {
        match self {
            Self::Approved { .. } => DecisionKind::Approved,
            Self::ChangesRequested { .. } => DecisionKind::ChangesRequested,
        }
    }
}

/// Applies a review outcome to a card and returns the updated card.
///
/// The action row is consumed and a status note is inserted immediately before
/// the terminal block; every other block keeps its position and content. A
/// card that already shows a decision and no longer has controls is rejected
/// with [`CardError::AlreadyDecided`].
pub fn apply_outcome(card: &Card, outcome: &OutcomeEvent) -> Result<Card, CardError> {
    ensure_transitionable(card)?;

    let mut blocks = card
        .blocks()
        .iter()
        .filter(|block| !is_transition_owned(block))
        .cloned()
        .collect::<Vec<_>>();
    if blocks.is_empty() {
        return Err(CardError::EmptyCard);
    }

    let insert_at = blocks.len() - 1;
    blocks.insert(insert_at, CardBlock::StatusNote(render_status_note(outcome)));
    Ok(Card::new(blocks))
}

/// Checks that [`apply_outcome`] would accept `card`, without building the
/// new card. Callers run this before any irreversible side effect.
pub fn ensure_transitionable(card: &Card) -> Result<(), CardError> {
    if card.is_decided() {
        return Err(CardError::AlreadyDecided);
    }
    if card.blocks().iter().all(is_transition_owned) {
        return Err(CardError::EmptyCard);
    }
    Ok(())
}

fn is_transition_owned(block: &CardBlock) -> bool {
    matches!(block.kind(), BlockKind::ActionRow | BlockKind::StatusNote)
}

pub fn render_status_note(outcome: &OutcomeEvent) -> StatusNoteBlock {
    match outcome {
        OutcomeEvent::Approved { actor_name } => StatusNoteBlock {
            decision: DecisionKind::Approved,
            text: format!("Approved by {actor_name}"),
            quote: None,
        },
        OutcomeEvent::ChangesRequested {
            actor_name,
            comment,
        } => StatusNoteBlock {
            decision: DecisionKind::ChangesRequested,
            text: format!("Changes requested by {actor_name}"),
            quote: comment
                .as_deref()
                .filter(|comment| !comment.trim().is_empty())
                .map(ToOwned::to_owned),
        },
    }
}

/// Plain-text notification fallback sent with the updated card.
pub fn render_outcome_fallback_text(outcome: &OutcomeEvent) -> String {
    match outcome {
        OutcomeEvent::Approved { actor_name } => format!("GitHub PR approved by {actor_name}"),
        OutcomeEvent::ChangesRequested { actor_name, .. } => {
            format!("Changes requested on PR by {actor_name}")
        }
    }
}
