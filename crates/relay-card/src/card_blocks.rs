use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::RoutingPayload;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
/// Enumerates supported `BlockKind` values.
pub enum BlockKind {
    Summary,
    Description,
    Stats,
    ActionRow,
    StatusNote,
    Divider,
    Unrecognized,
}

impl BlockKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Summary => "summary",
            Self::Description => "description",
            Self::Stats => "stats",
            Self::ActionRow => "action_row",
            Self::StatusNote => "status_note",
            Self::Divider => "divider",
            Self::Unrecognized => "unrecognized",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AvatarImage {
    pub image_url: String,
    pub alt_text: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SummaryBlock {
    pub status_glyph: String,
    pub title: String,
    pub url: String,
    pub subtitle: String,
    pub avatar: Option<AvatarImage>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DescriptionBlock {
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatsBlock {
    pub author: String,
    pub branches: String,
    pub changes: String,
    pub mergeability_glyph: String,
    pub mergeability_label: String,
}

impl StatsBlock {
    /// The four fixed fields in display order.
    pub fn fields(&self) -> [(&'static str, String); 4] {
        [
            ("Author", self.author.clone()),
            ("Branch", self.branches.clone()),
            ("Changes", self.changes.clone()),
            (
                "Status",
                format!("{} {}", self.mergeability_glyph, self.mergeability_label),
            ),
        ]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
/// Interactive controls carried by an action row.
pub enum CardAction {
    Approve,
    RequestChanges,
    ViewExternal,
}

impl CardAction {
    pub fn action_id(&self) -> &'static str {
        match self {
            Self::Approve => "approve_pr",
            Self::RequestChanges => "request_changes",
            Self::ViewExternal => "view_github",
        }
    }

    pub fn from_action_id(raw: &str) -> Option<Self> {
        match raw.trim() {
            "approve_pr" => Some(Self::Approve),
            "request_changes" => Some(Self::RequestChanges),
            "view_github" => Some(Self::ViewExternal),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlStyle {
    Primary,
    Danger,
}

impl ControlStyle {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Primary => "primary",
            Self::Danger => "danger",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionControl {
    pub action: CardAction,
    pub label: String,
    pub style: Option<ControlStyle>,
    pub url: Option<String>,
    pub routing: RoutingPayload,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionRowBlock {
    pub controls: Vec<ActionControl>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecisionKind {
    Approved,
    ChangesRequested,
}

impl DecisionKind {
    pub fn glyph(&self) -> &'static str {
        match self {
            Self::Approved => "✅",
            Self::ChangesRequested => "🔄",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusNoteBlock {
    pub decision: DecisionKind,
    pub text: String,
    pub quote: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
/// One block of a card.
///
/// Blocks produced by the renderer or the transition engine are typed. Blocks
/// decoded from a Slack message are kept as `Persisted` so that updating a
/// card never rewrites content the transition does not own.
pub enum CardBlock {
    Summary(SummaryBlock),
    Description(DescriptionBlock),
    Stats(StatsBlock),
    ActionRow(ActionRowBlock),
    StatusNote(StatusNoteBlock),
    Divider,
    Persisted { kind: BlockKind, raw: Value },
}

impl CardBlock {
    pub fn kind(&self) -> BlockKind {
        match self {
            Self::Summary(_) => BlockKind::Summary,
            Self::Description(_) => BlockKind::Description,
            Self::Stats(_) => BlockKind::Stats,
            Self::ActionRow(_) => BlockKind::ActionRow,
            Self::StatusNote(_) => BlockKind::StatusNote,
            Self::Divider => BlockKind::Divider,
            Self::Persisted { kind, .. } => *kind,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
/// Ordered block sequence shown for one pull request.
pub struct Card {
    blocks: Vec<CardBlock>,
}

impl Card {
    pub fn new(blocks: Vec<CardBlock>) -> Self {
        Self { blocks }
    }

    pub fn blocks(&self) -> &[CardBlock] {
        &self.blocks
    }

    pub fn into_blocks(self) -> Vec<CardBlock> {
        self.blocks
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn kinds(&self) -> Vec<BlockKind> {
        self.blocks.iter().map(CardBlock::kind).collect()
    }

    pub fn position(&self, kind: BlockKind) -> Option<usize> {
        self.blocks.iter().position(|block| block.kind() == kind)
    }

    pub fn contains(&self, kind: BlockKind) -> bool {
        self.position(kind).is_some()
    }

    /// A card is decided once its controls are gone and a status note is shown.
    pub fn is_decided(&self) -> bool {
        !self.contains(BlockKind::ActionRow) && self.contains(BlockKind::StatusNote)
    }

    pub fn status_note(&self) -> Option<&StatusNoteBlock> {
        self.blocks.iter().find_map(|block| match block {
            CardBlock::StatusNote(note) => Some(note),
            _ => None,
        })
    }

    pub fn action_row(&self) -> Option<&ActionRowBlock> {
        self.blocks.iter().find_map(|block| match block {
            CardBlock::ActionRow(row) => Some(row),
            _ => None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::{BlockKind, Card, CardAction, CardBlock, DecisionKind, StatusNoteBlock};
    use serde_json::json;

    #[test]
    fn unit_card_action_ids_round_trip() {
        for action in [
            CardAction::Approve,
            CardAction::RequestChanges,
            CardAction::ViewExternal,
        ] {
            assert_eq!(CardAction::from_action_id(action.action_id()), Some(action));
        }
        assert_eq!(CardAction::from_action_id("merge_pr"), None);
    }

    #[test]
    fn unit_card_is_decided_requires_note_without_actions() {
        let undecided = Card::new(vec![CardBlock::Divider]);
        assert!(!undecided.is_decided());

        let decided = Card::new(vec![
            CardBlock::StatusNote(StatusNoteBlock {
                decision: DecisionKind::Approved,
                text: "Approved by Jane Doe".to_string(),
                quote: None,
            }),
            CardBlock::Divider,
        ]);
        assert!(decided.is_decided());

        let persisted = Card::new(vec![
            CardBlock::Persisted {
                kind: BlockKind::StatusNote,
                raw: json!({"type": "section", "block_id": "pr_status"}),
            },
            CardBlock::Divider,
        ]);
        assert!(persisted.is_decided());
        assert_eq!(
            persisted.kinds(),
            vec![BlockKind::StatusNote, BlockKind::Divider]
        );
    }
}
