//! DB row to API DTO conversions.
//!
//! Ids and timestamps are stored as text; a value that fails to parse means
//! the row is corrupt and surfaces as an internal error.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use uuid::Uuid;

use fitclub_db::models::{
    ChannelRow, ClubRow, DocumentRow, MessageRow, NotificationRow, PricingDetail, ReactionRow,
    UserRow,
};
use fitclub_types::api::{
    ChannelResponse, ClubResponse, DocumentResponse, GroupMember, GroupResponse, MessageResponse,
    NotificationResponse, PricingOptionResponse, PricingResponse, ReactionResponse, UserProfile,
};
use fitclub_types::notifications::NotificationPayload;

pub fn parse_id(raw: &str) -> Result<Uuid> {
    raw.parse().with_context(|| format!("corrupt id '{}'", raw))
}

pub fn parse_opt_id(raw: Option<&str>) -> Result<Option<Uuid>> {
    raw.map(parse_id).transpose()
}

pub fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    raw.parse::<DateTime<Utc>>()
        .or_else(|_| {
            // SQLite's CURRENT_TIMESTAMP form, without timezone.
            chrono::NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S").map(|ndt| ndt.and_utc())
        })
        .with_context(|| format!("corrupt timestamp '{}'", raw))
}

pub fn parse_opt_timestamp(raw: Option<&str>) -> Result<Option<DateTime<Utc>>> {
    raw.map(parse_timestamp).transpose()
}

pub fn user_profile(row: UserRow) -> Result<UserProfile> {
    Ok(UserProfile {
        id: parse_id(&row.id)?,
        profile_image_id: parse_opt_id(row.profile_image_id.as_deref())?,
        pricing_id: parse_opt_id(row.pricing_id.as_deref())?,
        created_at: parse_timestamp(&row.created_at)?,
        name: row.name,
        email: row.email,
        role: row.role,
        image: row.image,
    })
}

pub fn club_response(row: ClubRow, channel_id: &str) -> Result<ClubResponse> {
    Ok(ClubResponse {
        id: parse_id(&row.id)?,
        manager_id: parse_id(&row.manager_id)?,
        logo_id: parse_opt_id(row.logo_id.as_deref())?,
        channel_id: parse_id(channel_id)?,
        name: row.name,
    })
}

pub fn document_response(row: DocumentRow, url: Option<String>) -> Result<DocumentResponse> {
    Ok(DocumentResponse {
        id: parse_id(&row.id)?,
        user_id: parse_id(&row.user_id)?,
        kind: row.kind,
        size: u64::try_from(row.size).context("negative document size")?,
        url,
    })
}

pub fn channel_response(row: ChannelRow) -> Result<ChannelResponse> {
    Ok(ChannelResponse {
        id: parse_id(&row.id)?,
        owner_id: parse_id(&row.owner_id)?,
        club_id: parse_opt_id(row.club_id.as_deref())?,
        coach_id: parse_opt_id(row.coach_id.as_deref())?,
        group_image_id: parse_opt_id(row.group_image_id.as_deref())?,
        created_at: parse_timestamp(&row.created_at)?,
        name: row.name,
        channel_type: row.channel_type,
    })
}

pub fn group_response(row: ChannelRow, members: Vec<(String, String)>) -> Result<GroupResponse> {
    let users = members
        .into_iter()
        .map(|(id, name)| Ok(GroupMember { id: parse_id(&id)?, name }))
        .collect::<Result<Vec<_>>>()?;

    Ok(GroupResponse {
        id: parse_id(&row.id)?,
        owner_id: parse_id(&row.owner_id)?,
        group_image_id: parse_opt_id(row.group_image_id.as_deref())?,
        name: row.name,
        users,
    })
}

pub fn reaction_response(row: &ReactionRow) -> Result<ReactionResponse> {
    Ok(ReactionResponse {
        id: parse_id(&row.id)?,
        from_id: parse_id(&row.from_id)?,
        reaction: row.reaction,
    })
}

/// `reactions` may hold rows for other messages; only this message's are kept.
pub fn message_response(row: MessageRow, reactions: &[ReactionRow]) -> Result<MessageResponse> {
    let reactions = reactions
        .iter()
        .filter(|r| r.message_id == row.id)
        .map(reaction_response)
        .collect::<Result<Vec<_>>>()?;

    Ok(MessageResponse {
        id: parse_id(&row.id)?,
        channel_id: parse_id(&row.channel_id)?,
        from_id: parse_id(&row.from_id)?,
        message_ref_id: parse_opt_id(row.message_ref_id.as_deref())?,
        created_at: parse_timestamp(&row.created_at)?,
        from_name: row.from_name,
        message: row.message,
        reactions,
    })
}

pub fn notification_response(row: NotificationRow) -> Result<NotificationResponse> {
    let payload = NotificationPayload::from_parts(&row.notification_type, row.data.as_deref())
        .with_context(|| format!("notification '{}'", row.id))?;

    Ok(NotificationResponse {
        id: parse_id(&row.id)?,
        user_from_id: parse_id(&row.user_from_id)?,
        user_to_id: parse_id(&row.user_to_id)?,
        linked_notification: parse_opt_id(row.linked_notification.as_deref())?,
        answered: parse_opt_timestamp(row.answered.as_deref())?,
        view_date: parse_opt_timestamp(row.view_date.as_deref())?,
        created_at: parse_timestamp(&row.created_at)?,
        payload,
        message: row.message,
        answer: row.answer,
    })
}

pub fn pricing_response(detail: PricingDetail) -> Result<PricingResponse> {
    let PricingDetail {
        pricing,
        options,
        features,
    } = detail;

    let options = options
        .into_iter()
        .map(|o| {
            Ok(PricingOptionResponse {
                id: parse_id(&o.id)?,
                name: o.name,
                weight: o.weight,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(PricingResponse {
        id: parse_id(&pricing.id)?,
        deletion_date: parse_opt_timestamp(pricing.deletion_date.as_deref())?,
        created_at: parse_timestamp(&pricing.created_at)?,
        role_target: pricing.role_target,
        title: pricing.title,
        description: pricing.description,
        free: pricing.free,
        highlighted: pricing.highlighted,
        monthly: pricing.monthly,
        yearly: pricing.yearly,
        deleted: pricing.deleted,
        options,
        features,
    })
}
