use serde::{Deserialize, Serialize};

/// The "regarding" checkboxes of a message slip, keyed on the wire by their
/// form checkbox ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum SlipStatus {
    #[serde(rename = "statusTelephoned")]
    Telephoned,
    #[serde(rename = "statusPleaseCall")]
    PleaseCall,
    #[serde(rename = "statusCameToSeeYou")]
    CameToSeeYou,
    #[serde(rename = "statusWillCallAgain")]
    WillCallAgain,
    #[serde(rename = "statusWantsToSeeYou")]
    WantsToSeeYou,
    #[serde(rename = "statusRush")]
    Rush,
    #[serde(rename = "statusReturnedCall")]
    ReturnedCall,
    #[serde(rename = "statusSpecialAttention")]
    SpecialAttention,
    #[serde(rename = "statusUrgent")]
    Urgent,
    #[serde(rename = "statusSentDocs")]
    SentDocs,
}

impl SlipStatus {
    /// Display order on the slip.
    pub const ALL: [SlipStatus; 10] = [
        SlipStatus::Telephoned,
        SlipStatus::PleaseCall,
        SlipStatus::CameToSeeYou,
        SlipStatus::WillCallAgain,
        SlipStatus::WantsToSeeYou,
        SlipStatus::Rush,
        SlipStatus::ReturnedCall,
        SlipStatus::SpecialAttention,
        SlipStatus::Urgent,
        SlipStatus::SentDocs,
    ];

    pub fn label(self) -> &'static str {
        match self {
            SlipStatus::Telephoned => "Telephoned",
            SlipStatus::PleaseCall => "Please call",
            SlipStatus::CameToSeeYou => "Came to see you",
            SlipStatus::WillCallAgain => "Will call again",
            SlipStatus::WantsToSeeYou => "Wants to see you",
            SlipStatus::Rush => "Rush",
            SlipStatus::ReturnedCall => "Returned your call",
            SlipStatus::SpecialAttention => "Special attention",
            SlipStatus::Urgent => "Urgent",
            SlipStatus::SentDocs => "Sent documents",
        }
    }
}

/// `messageContext` text for a set of checked statuses: labels in display
/// order, each once, joined by ", ". Empty when nothing is checked.
pub fn message_context(statuses: &[SlipStatus]) -> String {
    SlipStatus::ALL
        .iter()
        .filter(|status| statuses.contains(status))
        .map(|status| status.label())
        .collect::<Vec<_>>()
        .join(", ")
}
