use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
/// Enumerates failures raised while normalizing, routing, or transitioning cards.
pub enum CardError {
    #[error("malformed review payload: missing or invalid field `{field}`")]
    MalformedPayload { field: &'static str },
    #[error("card has no terminal block to insert a status note before")]
    EmptyCard,
    #[error("card already records a review decision")]
    AlreadyDecided,
    #[error("invalid routing payload: {0}")]
    InvalidRouting(String),
}
