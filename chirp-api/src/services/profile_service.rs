//! Profile Service

use std::sync::Arc;

use chirp_core::{
    paginate, text::normalize_username, ChirpError, EntityType, PageRequest, Pagination,
    ProfileUpdate, StorageError, User, UserId, UserSummary,
};
use chirp_storage::{cache_keys, CacheRead, CoherentCache, GraphStore, UserMutation};

use crate::error::{ApiError, ApiResult};

#[derive(Clone)]
pub struct ProfileService {
    store: Arc<dyn GraphStore>,
    cache: CoherentCache,
}

impl ProfileService {
    pub fn new(store: Arc<dyn GraphStore>, cache: CoherentCache) -> Self {
        Self { store, cache }
    }

    /// Profile by username, served from the cache when warm.
    pub async fn get_profile(&self, username: &str) -> ApiResult<CacheRead<User>> {
        let username = normalize_username(username).map_err(|_| ApiError::user_not_found())?;
        let key = cache_keys::profile(&username);
        let ttl = self.cache.config().profile_ttl;
        let store = self.store.clone();
        let read = self
            .cache
            .get_or_load(&key, ttl, || async move {
                let found = store.user_get_by_username(&username).await?;
                found.ok_or_else(|| {
                    ChirpError::from(StorageError::NotFoundByKey {
                        entity_type: EntityType::User,
                        key: username.clone(),
                    })
                })
            })
            .await?;
        Ok(read)
    }

    pub async fn get_user(&self, id: UserId) -> ApiResult<User> {
        self.store
            .user_get(id)
            .await?
            .ok_or_else(ApiError::user_not_found)
    }

    /// Apply a validated profile edit and drop the cached profile.
    pub async fn update_profile(&self, id: UserId, update: ProfileUpdate) -> ApiResult<User> {
        let update = update.validated()?;
        if update.is_empty() {
            return self.get_user(id).await;
        }
        let user = self
            .store
            .user_apply(id, UserMutation::UpdateProfile(update))
            .await?;
        self.cache.invalidate_profile(&user.username).await;
        tracing::info!(user_id = %id, "profile updated");
        Ok(user)
    }

    /// Page of the users following `id`.
    pub async fn followers(
        &self,
        id: UserId,
        page: PageRequest,
    ) -> ApiResult<(Vec<UserSummary>, Pagination)> {
        let user = self.get_user(id).await?;
        self.summarize(user.followers.into_iter().collect(), page).await
    }

    /// Page of the users `id` follows.
    pub async fn following(
        &self,
        id: UserId,
        page: PageRequest,
    ) -> ApiResult<(Vec<UserSummary>, Pagination)> {
        let user = self.get_user(id).await?;
        self.summarize(user.following.into_iter().collect(), page).await
    }

    async fn summarize(
        &self,
        ids: Vec<UserId>,
        page: PageRequest,
    ) -> ApiResult<(Vec<UserSummary>, Pagination)> {
        let pagination = Pagination::new(page, ids.len() as u64);
        let page_ids = paginate(ids, page);
        let users = self.store.users_get_many(&page_ids).await?;
        Ok((users.iter().map(User::summary).collect(), pagination))
    }
}
