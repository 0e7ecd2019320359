use std::fmt;
use std::str::FromStr;

use crate::error::CoreError;

/// Verifier-side states of a present-proof exchange, as reported by the agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExchangeState {
    /// Proof request sent, waiting for the holder.
    RequestSent,
    /// Holder answered; the agent has not finished verifying.
    PresentationReceived,
    /// The agent finished verification. Final state.
    Verified,
    /// The exchange was abandoned or failed. Final state.
    Abandoned,
}

impl ExchangeState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::RequestSent => "request_sent",
            Self::PresentationReceived => "presentation_received",
            Self::Verified => "verified",
            Self::Abandoned => "abandoned",
        }
    }
}

impl FromStr for ExchangeState {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "request_sent" | "request-sent" => Ok(Self::RequestSent),
            "presentation_received" | "presentation-received" => Ok(Self::PresentationReceived),
            "verified" | "done" => Ok(Self::Verified),
            "abandoned" => Ok(Self::Abandoned),
            other => Err(CoreError::InvalidExchangeState(other.to_string())),
        }
    }
}

impl fmt::Display for ExchangeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
