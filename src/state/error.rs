use thiserror::Error;

/// Rejections raised by room, topic and match operations.
///
/// None of these mutate state: the operation that returns one leaves the room untouched.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RoomError {
    /// Malformed input such as an over-long topic.
    #[error("{0}")]
    Validation(String),
    /// The room is reconciling its topic and refuses commands until it is done.
    #[error("room {0} is updating its topic; try again once it has finished")]
    Busy(u32),
    /// The command does not apply to the current room or match state.
    #[error("{0}")]
    Conflict(String),
    /// The referenced topic, match, participant or room does not exist.
    #[error("{0}")]
    NotFound(String),
}

impl RoomError {
    pub(crate) fn conflict(message: impl Into<String>) -> Self {
        RoomError::Conflict(message.into())
    }

    pub(crate) fn not_found(message: impl Into<String>) -> Self {
        RoomError::NotFound(message.into())
    }
}
