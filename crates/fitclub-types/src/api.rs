use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

use crate::models::{ChannelType, DocumentKind, Feature, ReactionKind, Role};
use crate::notifications::{Answer, NotificationPayload};

/// Patch field: absent is `None`, an explicit `null` is `Some(None)`.
fn nullable<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

// -- JWT Claims --

/// Session claims carried by the bearer token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub name: String,
    pub role: Role,
    pub exp: usize,
}

// -- Auth --

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub role: Option<Role>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    pub user_id: Uuid,
    pub role: Role,
    pub token: String,
}

// -- Users --

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub image: Option<String>,
    pub profile_image_id: Option<Uuid>,
    pub pricing_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct UpdateUserRequest {
    pub name: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub image: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub profile_image_id: Option<Option<Uuid>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct UpdateRoleRequest {
    pub role: Role,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct SubscribePricingRequest {
    pub pricing_id: Uuid,
}

// -- Clubs & coaches --

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CreateClubRequest {
    pub name: String,
    pub logo_id: Option<Uuid>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClubResponse {
    pub id: Uuid,
    pub name: String,
    pub manager_id: Uuid,
    pub logo_id: Option<Uuid>,
    pub channel_id: Uuid,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CoachResponse {
    pub id: Uuid,
    pub user_id: Uuid,
    pub channel_id: Uuid,
}

// -- Documents --

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadQuery {
    pub kind: DocumentKind,
    pub file_name: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentResponse {
    pub id: Uuid,
    pub user_id: Uuid,
    pub kind: DocumentKind,
    pub size: u64,
    pub url: Option<String>,
}

// -- Messages --

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelListQuery {
    pub user_id: Uuid,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelListItem {
    pub id: Uuid,
    pub name: String,
    pub image_url: String,
    pub owner: bool,
    #[serde(rename = "type")]
    pub channel_type: ChannelType,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessagesQuery {
    #[serde(default = "default_page")]
    pub page: u32,
}

fn default_page() -> u32 {
    1
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessagesResponse {
    pub messages: Vec<MessageResponse>,
    pub last_view: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageResponse {
    pub id: Uuid,
    pub channel_id: Uuid,
    pub from_id: Uuid,
    pub from_name: String,
    pub message: String,
    pub message_ref_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub reactions: Vec<ReactionResponse>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReactionResponse {
    pub id: Uuid,
    pub from_id: Uuid,
    pub reaction: ReactionKind,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CreateMessageRequest {
    pub message: String,
    pub message_ref_id: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct AddReactionRequest {
    pub reaction: ReactionKind,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageViewResponse {
    pub channel_id: Uuid,
    pub last_view: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CreateGroupRequest {
    pub name: String,
    pub image_id: Option<Uuid>,
    #[serde(default)]
    pub users: Vec<Uuid>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CreatePrivateChannelRequest {
    pub user_id: Uuid,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct UpdateGroupRequest {
    pub name: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub image_id: Option<Option<Uuid>>,
    pub users: Option<Vec<Uuid>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelResponse {
    pub id: Uuid,
    pub name: String,
    #[serde(rename = "type")]
    pub channel_type: ChannelType,
    pub owner_id: Uuid,
    pub club_id: Option<Uuid>,
    pub coach_id: Option<Uuid>,
    pub group_image_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupResponse {
    pub id: Uuid,
    pub name: String,
    pub owner_id: Uuid,
    pub group_image_id: Option<Uuid>,
    pub users: Vec<GroupMember>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupMember {
    pub id: Uuid,
    pub name: String,
}

// -- Notifications --

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateNotificationRequest {
    pub from: Uuid,
    pub to: Uuid,
    #[serde(flatten)]
    pub payload: NotificationPayload,
    #[serde(default)]
    pub message: String,
    pub linked_notification: Option<Uuid>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationResponse {
    pub id: Uuid,
    pub user_from_id: Uuid,
    pub user_to_id: Uuid,
    #[serde(flatten)]
    pub payload: NotificationPayload,
    pub message: String,
    pub linked_notification: Option<Uuid>,
    pub answer: Option<String>,
    pub answered: Option<DateTime<Utc>>,
    pub view_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetNotificationQuery {
    #[serde(default)]
    pub update_view_date: bool,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct UpdateNotificationRequest {
    pub answered: Option<DateTime<Utc>>,
    pub answer: Option<String>,
    pub linked_notification: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct AnswerNotificationRequest {
    pub answer: Answer,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerNotificationResponse {
    pub request: NotificationResponse,
    pub response: NotificationResponse,
}

// -- Pricing --

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct PricingBase {
    pub role_target: Role,
    pub title: String,
    pub description: String,
    #[serde(default)]
    pub free: bool,
    #[serde(default)]
    pub highlighted: bool,
    #[serde(default)]
    pub monthly: f64,
    #[serde(default)]
    pub yearly: f64,
}

/// Partial pricing fields; `id` selects the row.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct PricingPatch {
    pub id: Uuid,
    pub role_target: Option<Role>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub free: Option<bool>,
    pub highlighted: Option<bool>,
    pub monthly: Option<f64>,
    pub yearly: Option<f64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CreatePricingRequest {
    pub base: PricingBase,
    pub options: Vec<String>,
    pub features: Vec<Feature>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct UpdatePricingRequest {
    pub base: PricingPatch,
    pub options: Vec<String>,
    pub features: Vec<Feature>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PricingResponse {
    pub id: Uuid,
    pub role_target: Role,
    pub title: String,
    pub description: String,
    pub free: bool,
    pub highlighted: bool,
    pub monthly: f64,
    pub yearly: f64,
    pub deleted: bool,
    pub deletion_date: Option<DateTime<Utc>>,
    pub options: Vec<PricingOptionResponse>,
    pub features: Vec<Feature>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PricingOptionResponse {
    pub id: Uuid,
    pub name: String,
    pub weight: i64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DeletedResponse {
    pub count: usize,
}
