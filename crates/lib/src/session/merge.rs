//! Merge rules for building and updating the session user.
//!
//! Top-level fields are replaced when the patch carries them. The nested
//! records (social links, verification, stats, preferences) merge one level
//! deep, and achievements are appended with duplicates skipped by id.

use super::types::{
    Achievement, Preferences, SessionUser, SocialLinks, UsageStats, UserPatch, Verification,
};
use crate::identity::Identity;

/// Fallback display name when neither the identity nor its email provide one.
pub const DEFAULT_DISPLAY_NAME: &str = "User";

/// Overwrite `target` with every field present in `source`.
macro_rules! overlay {
    ($target:expr, $source:expr, [$($field:ident),+ $(,)?]) => {
        $(
            if $source.$field.is_some() {
                $target.$field = $source.$field.clone();
            }
        )+
    };
}

/// One-level-deep merge for nested profile records.
pub trait MergeFrom {
    fn merge_from(&mut self, other: &Self);
}

impl MergeFrom for SocialLinks {
    fn merge_from(&mut self, other: &Self) {
        overlay!(self, other, [linkedin, twitter, instagram, facebook]);
    }
}

impl MergeFrom for Verification {
    fn merge_from(&mut self, other: &Self) {
        overlay!(self, other, [email, phone, identity, address]);
    }
}

impl MergeFrom for UsageStats {
    fn merge_from(&mut self, other: &Self) {
        overlay!(
            self,
            other,
            [
                total_bookings,
                completed_bookings,
                total_spent,
                average_rating,
                response_rate,
                response_time,
                member_since,
            ]
        );
    }
}

impl MergeFrom for Preferences {
    fn merge_from(&mut self, other: &Self) {
        overlay!(self, other, [email_updates, notifications, dark_mode, language]);
    }
}

fn merge_nested<T: MergeFrom + Clone>(target: &mut Option<T>, source: &Option<T>) {
    match (target.as_mut(), source) {
        (Some(current), Some(update)) => current.merge_from(update),
        (None, Some(update)) => *target = Some(update.clone()),
        (_, None) => {}
    }
}

/// Append achievements whose id is not already present, keeping order.
fn append_achievements(target: &mut Vec<Achievement>, source: &[Achievement]) {
    for achievement in source {
        if target.iter().any(|a| a.id == achievement.id) {
            tracing::debug!(id = %achievement.id, "Skipping already earned achievement");
            continue;
        }
        target.push(achievement.clone());
    }
}

impl SessionUser {
    /// Base session user built from the canonical identity alone.
    pub fn from_identity(identity: &Identity) -> Self {
        let display_name = identity
            .display_name
            .clone()
            .filter(|name| !name.is_empty())
            .or_else(|| {
                identity
                    .email
                    .split('@')
                    .next()
                    .filter(|local| !local.is_empty())
                    .map(str::to_string)
            })
            .unwrap_or_else(|| DEFAULT_DISPLAY_NAME.to_string());

        let mut user = Self {
            uid: identity.uid.clone(),
            email: Some(identity.email.clone()).filter(|e| !e.is_empty()),
            display_name: Some(display_name),
            photo_url: identity.photo_url.clone(),
            role: identity.role,
            is_email_verified: identity.is_email_verified,
            created_at: Some(identity.created_at),
            last_login: Some(identity.last_login),
            profile: Default::default(),
        };
        user.profile.phone = identity.phone.clone();
        user
    }

    /// Apply `patch` on top of this user.
    pub fn apply(&mut self, patch: &UserPatch) {
        overlay!(self, patch, [display_name, photo_url]);

        let profile = &mut self.profile;
        overlay!(
            profile,
            patch,
            [phone, address, bio, website, skills, languages]
        );
        merge_nested(&mut profile.social, &patch.social);
        merge_nested(&mut profile.verification, &patch.verification);
        merge_nested(&mut profile.stats, &patch.stats);
        merge_nested(&mut profile.preferences, &patch.preferences);
        append_achievements(&mut profile.achievements, &patch.achievements);
    }

    /// Copy of this user with `patch` applied.
    pub fn merged(&self, patch: &UserPatch) -> Self {
        let mut next = self.clone();
        next.apply(patch);
        next
    }
}
