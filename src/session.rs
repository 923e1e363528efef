use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};
use crate::store::LocalStore;

pub const USER_KEY: &str = "atelier_user";
pub const AUTH_KEY: &str = "atelier_auth";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageCounters {
    pub images_created: u32,
    pub videos_created: u32,
    pub images_edited: u32,
    pub total_credits: u32,
    pub used_credits: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: String,
    pub name: String,
    pub email: String,
    pub avatar: String,
    pub join_date: DateTime<Utc>,
    pub subscription: String,
    pub usage: UsageCounters,
}

/// Local session state persisted across runs: the profile document and a
/// separate authentication flag. Authentication currently runs against a
/// stand-in backend that accepts any non-empty credentials.
pub struct SessionStore {
    store: LocalStore,
}

impl SessionStore {
    pub fn new(store: LocalStore) -> Self {
        Self { store }
    }

    pub fn login(&self, email: &str, password: &str) -> Result<UserProfile> {
        if email.trim().is_empty() || password.is_empty() {
            return Err(AppError::Auth(
                "email and password are required".to_string(),
            ));
        }

        let name = "Studio User";
        let profile = UserProfile {
            id: "1".to_string(),
            name: name.to_string(),
            email: email.to_string(),
            avatar: avatar_url(name),
            join_date: Utc::now(),
            subscription: "premium".to_string(),
            usage: UsageCounters {
                images_created: 42,
                videos_created: 8,
                images_edited: 156,
                total_credits: 1000,
                used_credits: 234,
            },
        };

        self.store.put(USER_KEY, &profile)?;
        self.store.put(AUTH_KEY, &true)?;
        Ok(profile)
    }

    pub fn logout(&self) -> Result<()> {
        self.store.remove(USER_KEY)?;
        self.store.remove(AUTH_KEY)
    }

    /// Both the profile document and the flag must be present; either one
    /// alone does not make a session.
    pub fn is_authenticated(&self) -> bool {
        let flag = self
            .store
            .get::<bool>(AUTH_KEY)
            .ok()
            .flatten()
            .unwrap_or(false);
        flag && matches!(self.current_user(), Ok(Some(_)))
    }

    pub fn current_user(&self) -> Result<Option<UserProfile>> {
        self.store.get(USER_KEY)
    }

    pub fn update_profile<F>(&self, apply: F) -> Result<UserProfile>
    where
        F: FnOnce(&mut UserProfile),
    {
        let mut profile = self
            .current_user()?
            .ok_or_else(|| AppError::Auth("no active session".to_string()))?;
        apply(&mut profile);
        self.store.put(USER_KEY, &profile)?;
        Ok(profile)
    }

    /// Identity used for catalog access checks.
    pub fn user_id(&self) -> String {
        self.current_user()
            .ok()
            .flatten()
            .map(|profile| profile.name)
            .unwrap_or_else(|| "anonymous".to_string())
    }
}

fn avatar_url(name: &str) -> String {
    format!(
        "https://ui-avatars.com/api/?name={}&background=6366f1&color=fff&size=128",
        name.replace(' ', "+")
    )
}
