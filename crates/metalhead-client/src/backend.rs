//! The remote backend contract.
//!
//! The transport (agent, gateway, candid encoding) lives outside this crate;
//! hosts hand the client an `Arc<dyn Backend>` once the actor is ready.

use async_trait::async_trait;
use metalhead_shared::{
    FeedPost, FriendRequest, PostId, Principal, Report, UserProfile, UserRole,
};

use crate::error::RemoteError;

pub type RemoteResult<T> = std::result::Result<T, RemoteError>;

/// Every operation the backend actor exposes. All calls are made as the
/// signed-in caller.
#[async_trait]
pub trait Backend: Send + Sync {
    async fn assign_caller_user_role(&self, user: Principal, role: UserRole) -> RemoteResult<()>;

    async fn block_user(&self, target: Principal) -> RemoteResult<()>;

    async fn create_post(&self, content: String) -> RemoteResult<PostId>;

    async fn delete_own_account(&self) -> RemoteResult<()>;

    async fn delete_post(&self, post_id: PostId) -> RemoteResult<()>;

    async fn get_blocked_users(&self) -> RemoteResult<Vec<Principal>>;

    async fn get_caller_user_profile(&self) -> RemoteResult<Option<UserProfile>>;

    async fn get_caller_user_role(&self) -> RemoteResult<UserRole>;

    async fn get_feed(&self) -> RemoteResult<Vec<FeedPost>>;

    async fn get_friends(&self, user: Principal) -> RemoteResult<Vec<Principal>>;

    async fn get_pending_requests(&self) -> RemoteResult<Vec<FriendRequest>>;

    /// Reports grouped by post id.
    async fn get_reports(&self) -> RemoteResult<Vec<(PostId, Vec<Report>)>>;

    async fn get_user_posts(&self, user: Principal) -> RemoteResult<Vec<FeedPost>>;

    async fn get_user_profile(&self, user: Principal) -> RemoteResult<Option<UserProfile>>;

    async fn is_caller_admin(&self) -> RemoteResult<bool>;

    async fn is_user_blocked(&self, target: Principal) -> RemoteResult<bool>;

    async fn like_post(&self, post_id: PostId) -> RemoteResult<()>;

    async fn report_content(
        &self,
        reported_user: Option<Principal>,
        reported_post: Option<PostId>,
        reason: String,
    ) -> RemoteResult<()>;

    async fn respond_to_friend_request(&self, from: Principal, accept: bool) -> RemoteResult<()>;

    async fn save_caller_user_profile(&self, profile: UserProfile) -> RemoteResult<()>;

    async fn send_friend_request(&self, to: Principal) -> RemoteResult<()>;

    async fn unblock_user(&self, target: Principal) -> RemoteResult<()>;

    async fn update_profile(&self, profile: UserProfile) -> RemoteResult<()>;

    async fn verify_age_and_create_profile(&self, profile: UserProfile) -> RemoteResult<()>;
}
