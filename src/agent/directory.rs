//! User directory collaborator
//!
//! Looks up user profiles by id. The Greeter is the only consumer; the core
//! only ever passes the resulting id through.

use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::core::Result;

/// Public part of a user's profile
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: i64,
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub dietary_preference: Option<String>,
}

impl UserProfile {
    pub fn new(id: i64, first_name: impl Into<String>) -> Self {
        Self {
            id,
            first_name: first_name.into(),
            last_name: String::new(),
            dietary_preference: None,
        }
    }
}

/// Source of user profiles
#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// Look a user up. `Ok(None)` means the user does not exist.
    async fn fetch_user(&self, user_id: i64) -> Result<Option<UserProfile>>;
}

/// Directory backed by a fixed set of profiles
#[derive(Debug, Clone, Default)]
pub struct InMemoryUserDirectory {
    users: HashMap<i64, UserProfile>,
}

impl InMemoryUserDirectory {
    pub fn new(users: impl IntoIterator<Item = UserProfile>) -> Self {
        Self {
            users: users.into_iter().map(|u| (u.id, u)).collect(),
        }
    }

    /// Add or replace a profile
    pub fn insert(&mut self, profile: UserProfile) {
        self.users.insert(profile.id, profile);
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }
}

#[async_trait]
impl UserDirectory for InMemoryUserDirectory {
    async fn fetch_user(&self, user_id: i64) -> Result<Option<UserProfile>> {
        Ok(self.users.get(&user_id).cloned())
    }
}
