//! Pull-request card model for the Slack review bridge.
//!
//! Normalizes GitHub pull-request payloads, renders them into an ordered block
//! card, applies review outcomes to an existing card, and converts cards to and
//! from the Slack Block Kit JSON that Slack persists between interactions.
//! Nothing in this crate performs I/O.

pub mod block_kit;
pub mod card_blocks;
pub mod card_error;
pub mod card_render;
pub mod card_text;
pub mod card_transition;
pub mod review_modal;
pub mod review_request;
pub mod routing;

pub use card_blocks::*;
pub use card_error::CardError;
pub use card_render::{render_card, render_card_fallback_text};
pub use card_transition::{
    apply_outcome, ensure_transitionable, render_outcome_fallback_text, OutcomeEvent,
};
pub use review_modal::{
    extract_modal_comment, request_changes_modal, ModalContext, REQUEST_CHANGES_CALLBACK_ID,
};
pub use review_request::*;
pub use routing::RoutingPayload;
