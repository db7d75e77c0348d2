use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Where a user currently is in the direct-message registration conversation.
/// Stored as its kebab-case name in `registration_sessions.stage`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Stage {
    CollectingNickname,
    CollectingFirstname,
    CollectingLastname,
    CollectingEmail,
    CollectingCountry,
    ConfirmingCountry,
    CollectingPreferredSeats,
    /// Summary shown with Continue / Edit / Cancel buttons. A session in this
    /// stage without a seat is a reserve-list confirmation.
    ShowingConfirmation,
    /// The user already holds a registration for the event and was shown
    /// their current details with No Changes / Edit buttons.
    EditingExistingRegistration,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CollectingNickname => "collecting-nickname",
            Self::CollectingFirstname => "collecting-firstname",
            Self::CollectingLastname => "collecting-lastname",
            Self::CollectingEmail => "collecting-email",
            Self::CollectingCountry => "collecting-country",
            Self::ConfirmingCountry => "confirming-country",
            Self::CollectingPreferredSeats => "collecting-preferred-seats",
            Self::ShowingConfirmation => "showing-confirmation",
            Self::EditingExistingRegistration => "editing-existing-registration",
        }
    }

    /// Stages that only accept button presses, not free text.
    pub fn awaits_buttons(&self) -> bool {
        matches!(self, Self::ShowingConfirmation | Self::EditingExistingRegistration)
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a stored stage string is not one this build knows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownStage(pub String);

impl fmt::Display for UnknownStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown registration stage '{}'", self.0)
    }
}

impl std::error::Error for UnknownStage {}

impl FromStr for Stage {
    type Err = UnknownStage;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let stage = match s {
            "collecting-nickname" => Self::CollectingNickname,
            "collecting-firstname" => Self::CollectingFirstname,
            "collecting-lastname" => Self::CollectingLastname,
            "collecting-email" => Self::CollectingEmail,
            "collecting-country" => Self::CollectingCountry,
            "confirming-country" => Self::ConfirmingCountry,
            "collecting-preferred-seats" => Self::CollectingPreferredSeats,
            "showing-confirmation" => Self::ShowingConfirmation,
            "editing-existing-registration" => Self::EditingExistingRegistration,
            other => return Err(UnknownStage(other.to_string())),
        };
        Ok(stage)
    }
}

/// Lifecycle of the seat held by a registration row.
///
/// `Reserved` is a hold placed while the user is still confirming; the sweep
/// flips holds older than the hold window to `Available`, which frees the
/// seat number for everyone else. `Confirmed` rows are never swept.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RegistrationStatus {
    Available,
    Reserved,
    Confirmed,
}

impl RegistrationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Available => "available",
            Self::Reserved => "reserved",
            Self::Confirmed => "confirmed",
        }
    }
}

impl FromStr for RegistrationStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "available" => Ok(Self::Available),
            "reserved" => Ok(Self::Reserved),
            "confirmed" => Ok(Self::Confirmed),
            other => Err(format!("unknown registration status '{}'", other)),
        }
    }
}
