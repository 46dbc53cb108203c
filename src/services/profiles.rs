use std::sync::Arc;
use uuid::Uuid;

use crate::{
    db::Datastore,
    error::{AppError, AppResult},
    models::{NewProfile, Profile},
};

pub struct ProfileService {
    store: Arc<dyn Datastore>,
}

impl ProfileService {
    pub fn new(store: Arc<dyn Datastore>) -> Self {
        Self { store }
    }

    pub async fn create_profile(&self, profile: NewProfile) -> AppResult<Profile> {
        profile.validate()?;

        let profile = NewProfile {
            id: profile.id,
            full_name: profile.full_name.trim().to_string(),
            email: profile.email.trim().to_lowercase(),
        };
        let created = self.store.insert_profile(profile).await?;

        tracing::info!(profile_id = %created.id, "Profile created");
        Ok(created)
    }

    pub async fn get_profile(&self, id: Uuid) -> AppResult<Profile> {
        self.store
            .get_profile(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Profile {} not found", id)))
    }
}
