//! Profile fields applied right after a successful sign-in or sign-up.

use crate::{
    clock::Clock,
    identity::Identity,
    session::{Achievement, Preferences, UsageStats, UserPatch, Verification},
};

pub const WELCOME_BIO: &str = "New member of Smart ServiceHub";

fn stats(member_since: String) -> UsageStats {
    UsageStats {
        total_bookings: Some(0),
        completed_bookings: Some(0),
        total_spent: Some(0.0),
        average_rating: Some(5.0),
        response_rate: Some(100.0),
        response_time: Some("< 1 hour".to_string()),
        member_since: Some(member_since),
    }
}

fn preferences() -> Preferences {
    Preferences {
        email_updates: Some(true),
        notifications: Some(true),
        dark_mode: Some(false),
        language: Some("en".to_string()),
    }
}

/// Email verified at the product level, nothing else.
fn verification() -> Verification {
    Verification {
        email: Some(true),
        phone: Some(false),
        identity: Some(false),
        address: Some(false),
    }
}

fn achievement(id: &str, title: &str, description: &str, icon: &str, earned_at: String) -> Achievement {
    Achievement {
        id: id.to_string(),
        title: title.to_string(),
        description: description.to_string(),
        icon: icon.to_string(),
        earned_at,
    }
}

fn non_empty(value: &str) -> Option<String> {
    (!value.is_empty()).then(|| value.to_string())
}

/// Applied after every password sign-in. Resets the stats.
pub fn login(clock: &dyn Clock, phone: &str) -> UserPatch {
    UserPatch {
        phone: non_empty(phone),
        stats: Some(stats(clock.date_label())),
        preferences: Some(preferences()),
        ..Default::default()
    }
}

/// Applied after a new account is registered.
pub fn signup(clock: &dyn Clock, full_name: &str, phone: &str) -> UserPatch {
    let today = clock.date_label();
    UserPatch {
        display_name: Some(full_name.to_string()),
        phone: non_empty(phone),
        address: Some(String::new()),
        bio: Some(WELCOME_BIO.to_string()),
        verification: Some(verification()),
        stats: Some(stats(today.clone())),
        achievements: vec![achievement(
            "welcome",
            "Welcome Aboard!",
            "Successfully joined Smart ServiceHub",
            "🎉",
            today,
        )],
        preferences: Some(preferences()),
        ..Default::default()
    }
}

/// Applied after signing in through the external provider.
pub fn external(clock: &dyn Clock, user: &Identity) -> UserPatch {
    let today = clock.date_label();
    let display_name = user
        .display_name
        .clone()
        .filter(|n| !n.is_empty())
        .or_else(|| user.email.split('@').next().and_then(non_empty));
    UserPatch {
        display_name,
        photo_url: user.photo_url.clone(),
        verification: Some(verification()),
        stats: Some(stats(today.clone())),
        achievements: vec![achievement(
            "google_signup",
            "Quick Starter!",
            "Joined using Google authentication",
            "🚀",
            today,
        )],
        preferences: Some(preferences()),
        ..Default::default()
    }
}
