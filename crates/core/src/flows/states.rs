use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    #[default]
    Empty,
    Draft,
    Generated,
    Sending,
    Sent,
    SendFailed,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionEvent {
    FormEdited,
    QuotationGenerated,
    SendStarted,
    SendSucceeded,
    SendFailed,
    ResetRequested,
}

impl SessionState {
    /// Next state for `event`, or `None` when the transition is not allowed.
    pub fn next(self, event: SessionEvent) -> Option<Self> {
        use SessionEvent::{
            FormEdited, QuotationGenerated, ResetRequested, SendFailed, SendStarted,
            SendSucceeded,
        };
        use SessionState::{Draft, Empty, Generated, Sending, Sent};

        match (self, event) {
            (Sending, SendSucceeded) => Some(Sent),
            (Sending, SendFailed) => Some(Self::SendFailed),
            (Sending, _) => None,
            (_, ResetRequested) => Some(Empty),
            (Empty | Draft | Generated | Self::SendFailed, FormEdited) => Some(Draft),
            (Empty | Draft | Generated | Self::SendFailed, QuotationGenerated) => Some(Generated),
            (Draft | Generated | Self::SendFailed, SendStarted) => Some(Sending),
            _ => None,
        }
    }

    pub fn is_busy(self) -> bool {
        self == Self::Sending
    }
}
