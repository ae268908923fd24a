//! Follows, profile stats and connections, public profiles, and the owner's
//! profile edits.

pub mod artists;

use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::backend::models::{AuthUser, ConnectionKind, Profile};
use crate::backend::{AuthApi, FollowTable, ObjectStore, ProfileTable};
use crate::error::{AppError, AppResult};
use crate::pipeline::{BackfillReport, SnippetPipeline};
use crate::snippets::SnippetsView;
use crate::storage::prefs::SnippetsLayout;
use crate::storage::unix_now_millis;

pub use artists::{artists_in_common, top_artists, CommonArtist, TopArtist};

pub const PROFILE_IMAGES_BUCKET: &str = "profile-images";

/// Follow relationship between the viewer and one profile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FollowState {
    pub target_id: String,
    pub is_following: bool,
    pub followers_count: u64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProfileStats {
    pub snippets: u64,
    pub followers: u64,
    pub following: u64,
}

#[derive(Debug, Clone)]
pub struct PublicProfile {
    pub profile: Option<Profile>,
    pub snippets: SnippetsView,
    pub is_own: bool,
    pub artists_in_common: Vec<CommonArtist>,
    /// Present when someone is signed in.
    pub follow: Option<FollowState>,
    pub backfill: BackfillReport,
}

#[derive(Clone)]
pub struct SocialService {
    auth: Arc<dyn AuthApi>,
    profiles: Arc<dyn ProfileTable>,
    follows: Arc<dyn FollowTable>,
    objects: Arc<dyn ObjectStore>,
    pipeline: SnippetPipeline,
}

fn guarded(what: &str, result: AppResult<u64>) -> u64 {
    result.unwrap_or_else(|e| {
        tracing::warn!("{what} count failed: {e}");
        0
    })
}

impl SocialService {
    pub fn new(
        auth: Arc<dyn AuthApi>,
        profiles: Arc<dyn ProfileTable>,
        follows: Arc<dyn FollowTable>,
        objects: Arc<dyn ObjectStore>,
        pipeline: SnippetPipeline,
    ) -> Self {
        Self {
            auth,
            profiles,
            follows,
            objects,
            pipeline,
        }
    }

    async fn require_user(&self) -> AppResult<AuthUser> {
        self.pipeline.repo().require_user().await
    }

    async fn viewer(&self) -> Option<AuthUser> {
        self.auth.current_user().await.unwrap_or_else(|e| {
            tracing::warn!("reading session failed: {e}");
            None
        })
    }

    pub async fn follow_state(&self, target_id: &str) -> AppResult<FollowState> {
        let viewer = self.require_user().await?;
        let (is_following, followers_count) = tokio::join!(
            self.follows.exists(&viewer.id, target_id),
            self.follows.count_followers(target_id),
        );
        Ok(FollowState {
            target_id: target_id.to_string(),
            is_following: is_following?,
            followers_count: followers_count?,
        })
    }

    /// Flip the follow edge. Local state changes only once the write landed.
    pub async fn toggle_follow(&self, state: &mut FollowState) -> AppResult<()> {
        let viewer = self.require_user().await?;
        if state.is_following {
            self.follows.delete(&viewer.id, &state.target_id).await?;
            state.is_following = false;
            state.followers_count = state.followers_count.saturating_sub(1);
        } else {
            self.follows.insert(&viewer.id, &state.target_id).await?;
            state.is_following = true;
            state.followers_count += 1;
        }
        tracing::info!(
            "{} {}",
            if state.is_following { "followed" } else { "unfollowed" },
            state.target_id
        );
        Ok(())
    }

    /// Snippet, follower and following counts. Each failing count reads as 0.
    pub async fn stats(&self, user_id: &str) -> ProfileStats {
        let repo = self.pipeline.repo();
        let (snippets, followers, following) = tokio::join!(
            repo.count_for_user(user_id),
            self.follows.count_followers(user_id),
            self.follows.count_following(user_id),
        );
        ProfileStats {
            snippets: guarded("snippet", snippets),
            followers: guarded("followers", followers),
            following: guarded("following", following),
        }
    }

    pub async fn connections(&self, user_id: &str, kind: ConnectionKind) -> AppResult<Vec<Profile>> {
        let ids = match kind {
            ConnectionKind::Followers => self.follows.follower_ids(user_id).await?,
            ConnectionKind::Following => self.follows.following_ids(user_id).await?,
        };
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        self.profiles.get_many(&ids).await
    }

    /// Everything the public profile screen shows, including a color backfill
    /// over the loaded snippets.
    pub async fn public_profile(
        &self,
        user_id: &str,
        layout: SnippetsLayout,
        cancel: &CancellationToken,
    ) -> PublicProfile {
        let viewer = self.viewer().await;
        let is_own = viewer.as_ref().is_some_and(|v| v.id == user_id);
        let repo = self.pipeline.repo();

        let (profile, theirs, mine) = tokio::join!(
            self.profiles.get(user_id),
            repo.list_for_user(user_id),
            async {
                if viewer.is_some() && !is_own {
                    repo.list_mine().await
                } else {
                    Vec::new()
                }
            },
        );
        let profile = profile.unwrap_or_else(|e| {
            tracing::warn!("loading profile {user_id} failed: {e}");
            None
        });

        let common = if viewer.is_some() && !is_own {
            artists_in_common(&theirs, &mine)
        } else {
            Vec::new()
        };

        let mut snippets = SnippetsView::new(theirs, layout);
        let backfill = self.pipeline.backfill(&mut snippets, cancel).await;

        let follow = match viewer {
            Some(_) => match self.follow_state(user_id).await {
                Ok(state) => Some(state),
                Err(e) => {
                    tracing::warn!("loading follow state for {user_id} failed: {e}");
                    None
                }
            },
            None => None,
        };

        PublicProfile {
            profile,
            snippets,
            is_own,
            artists_in_common: common,
            follow,
            backfill,
        }
    }

    pub async fn rename(&self, full_name: &str) -> AppResult<()> {
        let name = full_name.trim();
        if name.is_empty() {
            return Err(AppError::validation("Name cannot be empty"));
        }
        let user = self.require_user().await?;
        self.profiles.update_name(&user.id, name).await?;
        tracing::info!("renamed profile {}", user.id);
        Ok(())
    }

    /// Upload a new profile photo and point the profile at its public URL.
    pub async fn upload_photo(&self, bytes: Vec<u8>) -> AppResult<String> {
        if bytes.is_empty() {
            return Err(AppError::validation("Image is empty"));
        }
        let user = self.require_user().await?;
        let name = format!("{}-{}.jpg", user.id, unix_now_millis());
        self.objects
            .upload(PROFILE_IMAGES_BUCKET, &name, bytes, "image/jpeg")
            .await?;
        let url = self.objects.public_url(PROFILE_IMAGES_BUCKET, &name);
        self.profiles.update_image_url(&user.id, &url).await?;
        tracing::info!("updated profile photo for {}", user.id);
        Ok(url)
    }
}
