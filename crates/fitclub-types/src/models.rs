use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind} '{value}'")]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}

/// Enums stored as TEXT columns. The DB spelling is the same as the JSON
/// spelling (SCREAMING_SNAKE_CASE).
macro_rules! text_enum {
    ($(#[$meta:meta])* $name:ident, $kind:literal { $($variant:ident => $text:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub enum $name {
            $(#[serde(rename = $text)] $variant),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }
        }

        impl FromStr for $name {
            type Err = UnknownVariant;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok($name::$variant),)+
                    other => Err(UnknownVariant { kind: $kind, value: other.to_string() }),
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

text_enum!(
    /// Account role. A user holds exactly one.
    Role, "role" {
        Member => "MEMBER",
        Coach => "COACH",
        Manager => "MANAGER",
        ManagerCoach => "MANAGER_COACH",
        Admin => "ADMIN",
    }
);

text_enum!(
    ChannelType, "channel type" {
        Club => "CLUB",
        Coach => "COACH",
        Group => "GROUP",
        Private => "PRIVATE",
    }
);

text_enum!(
    ReactionKind, "reaction" {
        Check => "CHECK",
        Grrr => "GRRR",
        Like => "LIKE",
        Lol => "LOL",
        Love => "LOVE",
        Sad => "SAD",
        Woah => "WOAH",
        Strength => "STRENGTH",
        Fist => "FIST",
    }
);

text_enum!(
    /// Capabilities unlocked by a pricing tier.
    Feature, "feature" {
        CoachCertification => "COACH_CERTIFICATION",
        CoachOffer => "COACH_OFFER",
        CoachMeeting => "COACH_MEETING",
        CoachPlan => "COACH_PLAN",
        ManagerCoach => "MANAGER_COACH",
        ManagerMultiClub => "MANAGER_MULTI_CLUB",
        ManagerEvents => "MANAGER_EVENTS",
        ManagerPlanning => "MANAGER_PLANNING",
        ManagerRooms => "MANAGER_ROOMS",
    }
);

text_enum!(
    DocumentKind, "document kind" {
        Image => "IMAGE",
        Certification => "CERTIFICATION",
        Document => "DOCUMENT",
        Photo => "PHOTO",
    }
);

impl Role {
    pub fn is_admin(&self) -> bool {
        matches!(self, Role::Admin)
    }
}
