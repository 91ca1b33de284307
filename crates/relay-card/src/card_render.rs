use crate::card_text::{
    mergeability_glyph, mergeability_label, status_glyph, truncate_chars, DESCRIPTION_MAX_CHARS,
};
use crate::{
    ActionControl, ActionRowBlock, AvatarImage, Card, CardAction, CardBlock, ControlStyle,
    DescriptionBlock, ReviewRequest, RoutingPayload, StatsBlock, SummaryBlock,
};

/// Renders the summary card for a pull request.
///
/// Block order is fixed: summary, optional description, stats, optional
/// action row, divider. The action row only appears for open, non-draft
/// pull requests.
pub fn render_card(request: &ReviewRequest, owner: &str, repo: &str, pull_number: u64) -> Card {
    let routing = RoutingPayload::new(owner, repo, pull_number);
    let mut blocks = vec![CardBlock::Summary(SummaryBlock {
        status_glyph: status_glyph(&request.state, request.draft).to_string(),
        title: request.title.clone(),
        url: request.html_url.clone(),
        subtitle: routing.slug(),
        avatar: request
            .author
            .avatar_url
            .as_ref()
            .map(|image_url| AvatarImage {
                image_url: image_url.clone(),
                alt_text: request.author.login.clone(),
            }),
    })];

    if let Some(body) = request
        .body
        .as_deref()
        .filter(|body| !body.trim().is_empty())
    {
        blocks.push(CardBlock::Description(DescriptionBlock {
            text: truncate_chars(body, DESCRIPTION_MAX_CHARS),
        }));
    }

    blocks.push(CardBlock::Stats(StatsBlock {
        author: request.author.login.clone(),
        branches: format!("{} → {}", request.source_branch, request.target_branch),
        changes: format!(
            "+{} -{} ({} files)",
            request.changes.additions, request.changes.deletions, request.changes.changed_files
        ),
        mergeability_glyph: mergeability_glyph(&request.mergeability).to_string(),
        mergeability_label: mergeability_label(&request.mergeability).to_string(),
    }));

    if request.accepts_review_actions() {
        blocks.push(CardBlock::ActionRow(render_action_row(
            &routing,
            &request.html_url,
        )));
    }

    blocks.push(CardBlock::Divider);
    Card::new(blocks)
}

fn render_action_row(routing: &RoutingPayload, html_url: &str) -> ActionRowBlock {
    ActionRowBlock {
        controls: vec![
            ActionControl {
                action: CardAction::Approve,
                label: "✅ Approve".to_string(),
                style: Some(ControlStyle::Primary),
                url: None,
                routing: routing.clone(),
            },
            ActionControl {
                action: CardAction::RequestChanges,
                label: "🔄 Request Changes".to_string(),
                style: Some(ControlStyle::Danger),
                url: None,
                routing: routing.clone(),
            },
            ActionControl {
                action: CardAction::ViewExternal,
                label: "🔗 View on GitHub".to_string(),
                style: None,
                url: Some(html_url.to_string()),
                routing: routing.clone(),
            },
        ],
    }
}

/// Plain-text notification fallback posted alongside a freshly rendered card.
pub fn render_card_fallback_text(request: &ReviewRequest) -> String {
    format!("GitHub PR: {}", request.title)
}
