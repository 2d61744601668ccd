//! Database row types. These map directly to SQLite rows.
//! Distinct from fitclub-types API models to keep the DB layer independent.
//! Enum columns are parsed at read time; ids and timestamps stay as text.

use fitclub_types::models::{ChannelType, DocumentKind, Feature, ReactionKind, Role};

#[derive(Debug, Clone)]
pub struct UserRow {
    pub id: String,
    pub name: String,
    pub email: String,
    pub password: String,
    pub role: Role,
    pub image: Option<String>,
    pub profile_image_id: Option<String>,
    pub pricing_id: Option<String>,
    pub created_at: String,
}

#[derive(Debug, Clone)]
pub struct DocumentRow {
    pub id: String,
    pub user_id: String,
    pub kind: DocumentKind,
    pub file_name: Option<String>,
    pub size: i64,
    pub created_at: String,
}

#[derive(Debug, Clone)]
pub struct ClubRow {
    pub id: String,
    pub name: String,
    pub manager_id: String,
    pub logo_id: Option<String>,
    pub created_at: String,
}

#[derive(Debug, Clone)]
pub struct CoachRow {
    pub id: String,
    pub user_id: String,
    pub created_at: String,
}

#[derive(Debug, Clone)]
pub struct ChannelRow {
    pub id: String,
    pub name: String,
    pub channel_type: ChannelType,
    pub owner_id: String,
    pub club_id: Option<String>,
    pub coach_id: Option<String>,
    pub group_image_id: Option<String>,
    pub created_at: String,
}

/// Document reference as `(owner user id, document id)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocRef {
    pub user_id: String,
    pub document_id: String,
}

/// A channel joined with everything needed to pick its display image.
#[derive(Debug, Clone)]
pub struct ChannelListRow {
    pub channel: ChannelRow,
    /// CLUB: the club's logo.
    pub club_logo: Option<DocRef>,
    /// COACH: the coach user's profile image document and provider image.
    pub coach_profile_image: Option<DocRef>,
    pub coach_image: Option<String>,
    /// GROUP: the stored group image.
    pub group_image: Option<DocRef>,
    /// PRIVATE: the owner's profile image document and provider image.
    pub owner_profile_image: Option<DocRef>,
    pub owner_image: Option<String>,
}

#[derive(Debug, Clone)]
pub struct MessageRow {
    pub id: String,
    pub channel_id: String,
    pub from_id: String,
    pub from_name: String,
    pub message: String,
    pub message_ref_id: Option<String>,
    pub created_at: String,
}

#[derive(Debug, Clone)]
pub struct ReactionRow {
    pub id: String,
    pub message_id: String,
    pub from_id: String,
    pub reaction: ReactionKind,
    pub created_at: String,
}

#[derive(Debug, Clone)]
pub struct NotificationRow {
    pub id: String,
    pub user_from_id: String,
    pub user_to_id: String,
    pub notification_type: String,
    pub data: Option<String>,
    pub message: String,
    pub linked_notification: Option<String>,
    pub answer: Option<String>,
    pub answered: Option<String>,
    pub view_date: Option<String>,
    pub created_at: String,
}

#[derive(Debug, Clone)]
pub struct PricingRow {
    pub id: String,
    pub role_target: Role,
    pub title: String,
    pub description: String,
    pub free: bool,
    pub highlighted: bool,
    pub monthly: f64,
    pub yearly: f64,
    pub deleted: bool,
    pub deletion_date: Option<String>,
    pub created_at: String,
}

#[derive(Debug, Clone)]
pub struct PricingOptionRow {
    pub id: String,
    pub pricing_id: String,
    pub name: String,
    pub weight: i64,
}

/// A pricing with its options (ordered by weight) and features.
#[derive(Debug, Clone)]
pub struct PricingDetail {
    pub pricing: PricingRow,
    pub options: Vec<PricingOptionRow>,
    pub features: Vec<Feature>,
}
