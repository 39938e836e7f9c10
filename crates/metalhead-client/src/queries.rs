//! Data-access layer: one method per backend operation.
//!
//! Reads are served from the [`QueryCache`] when fresh and otherwise fetched
//! under a [`FetchTicket`](crate::cache::FetchTicket), so only the newest
//! fetch for a key may write its result. Concurrent reads of one key share
//! a single fetch, and a reader whose fetch was superseded takes the newer
//! fetch's outcome. Mutations invalidate the query families that depend on
//! them. Every outcome is reported to the
//! [`GatewayTracker`], and every failure is normalized before it reaches a
//! page.

use std::future::Future;
use std::sync::Arc;

use metalhead_shared::{
    FeedPost, FriendRequest, PostId, Principal, Report, UserProfile, UserRole,
};
use tracing::{debug, info, warn};

use crate::backend::{Backend, RemoteResult};
use crate::cache::{Fetch, FetchWaiter, QueryCache, QueryFamily, QueryKey};
use crate::connection::ActorConnection;
use crate::error::{ClientError, NormalizedError, RemoteError, Result};
use crate::gateway::{is_gateway_resolution_error, log_gateway_error, GatewayTracker};
use crate::normalize::normalize_remote;

const PROFILE_MUTATION: &[QueryFamily] = &[QueryFamily::CurrentUserProfile];
const POST_MUTATION: &[QueryFamily] = &[QueryFamily::Feed, QueryFamily::UserPosts];
const FRIEND_REQUEST_SENT: &[QueryFamily] = &[QueryFamily::PendingRequests];
const FRIEND_REQUEST_ANSWERED: &[QueryFamily] =
    &[QueryFamily::PendingRequests, QueryFamily::Friends];
const USER_BLOCKED: &[QueryFamily] = &[
    QueryFamily::BlockedUsers,
    QueryFamily::Feed,
    QueryFamily::Friends,
    QueryFamily::PendingRequests,
    QueryFamily::IsBlocked,
    QueryFamily::Profile,
];
const USER_UNBLOCKED: &[QueryFamily] = &[
    QueryFamily::BlockedUsers,
    QueryFamily::IsBlocked,
    QueryFamily::Profile,
];
const ROLE_ASSIGNED: &[QueryFamily] = &[QueryFamily::CallerRole, QueryFamily::IsAdmin];

#[derive(Clone)]
pub struct DataClient {
    connection: ActorConnection,
    gateway: GatewayTracker,
    cache: QueryCache,
}

impl DataClient {
    pub fn new(connection: ActorConnection, gateway: GatewayTracker, cache: QueryCache) -> Self {
        Self {
            connection,
            gateway,
            cache,
        }
    }

    pub fn connection(&self) -> &ActorConnection {
        &self.connection
    }

    pub fn gateway(&self) -> &GatewayTracker {
        &self.gateway
    }

    pub fn cache(&self) -> &QueryCache {
        &self.cache
    }

    /// Whether calls are currently enabled.
    pub fn is_enabled(&self) -> bool {
        self.connection.actor().is_some()
    }

    fn actor(&self) -> Result<Arc<dyn Backend>> {
        self.connection.actor().ok_or(ClientError::ActorUnavailable)
    }

    /// Report a failed call and turn it into something a page can show.
    fn fail(&self, err: &RemoteError, context: &str) -> NormalizedError {
        if is_gateway_resolution_error(err) {
            log_gateway_error(err, context);
        }
        self.gateway.record_failure(err);
        normalize_remote(err)
    }

    async fn query<T, F, Fut>(&self, key: QueryKey, context: &'static str, call: F) -> Result<T>
    where
        T: Clone + Send + Sync + 'static,
        F: FnOnce(Arc<dyn Backend>) -> Fut,
        Fut: Future<Output = RemoteResult<T>>,
    {
        self.query_or(key, context, call, |_| None).await
    }

    /// Like [`DataClient::query`], but `recover` may turn a failure into a
    /// value. Recovered values are returned but never cached.
    async fn query_or<T, F, Fut, R>(
        &self,
        key: QueryKey,
        context: &'static str,
        call: F,
        recover: R,
    ) -> Result<T>
    where
        T: Clone + Send + Sync + 'static,
        F: FnOnce(Arc<dyn Backend>) -> Fut,
        Fut: Future<Output = RemoteResult<T>>,
        R: FnOnce(&NormalizedError) -> Option<T>,
    {
        let actor = self.actor()?;
        if let Some(value) = self.cache.get::<T>(&key) {
            debug!(key = ?key, "Serving from cache");
            return Ok(value);
        }

        let ticket = match self.cache.join_or_begin(key) {
            Fetch::Lead(ticket) => ticket,
            Fetch::Follow(waiter) => {
                debug!(key = ?waiter.key(), "Joining fetch in flight");
                let key = waiter.key().clone();
                return self.adopt(&key, Some(waiter)).await;
            }
        };

        let outcome = tokio::select! {
            biased;
            _ = ticket.cancelled() => None,
            outcome = call(actor) => Some(outcome),
        };
        let Some(outcome) = outcome else {
            let key = ticket.key().clone();
            debug!(key = ?key, "Fetch superseded");
            drop(ticket);
            return self.adopt(&key, None).await;
        };

        let result = match outcome {
            Ok(value) => {
                self.gateway.record_success();
                self.cache.complete(&ticket, value.clone());
                Ok(value)
            }
            Err(err) => {
                self.cache.abandon(&ticket);
                let normalized = self.fail(&err, context);
                recover(&normalized).ok_or(ClientError::Remote(normalized))
            }
        };
        ticket.publish(result.clone());
        result
    }

    /// Take the outcome of someone else's fetch for `key`. When the fetch
    /// being followed goes away without one, follow its successor, then fall
    /// back to the newest value no mutation has invalidated.
    async fn adopt<T>(&self, key: &QueryKey, mut waiter: Option<FetchWaiter>) -> Result<T>
    where
        T: Clone + Send + Sync + 'static,
    {
        loop {
            if let Some(current) = waiter.take() {
                if let Some(published) = current.outcome().await {
                    return published
                        .downcast_ref::<Result<T>>()
                        .cloned()
                        .unwrap_or(Err(ClientError::Superseded));
                }
            }
            match self.cache.follow(key) {
                Some(next) => waiter = Some(next),
                None => {
                    return self
                        .cache
                        .latest::<T>(key)
                        .ok_or(ClientError::Superseded);
                }
            }
        }
    }

    async fn mutate<T, F, Fut>(
        &self,
        context: &'static str,
        invalidates: &[QueryFamily],
        call: F,
    ) -> Result<T>
    where
        F: FnOnce(Arc<dyn Backend>) -> Fut,
        Fut: Future<Output = RemoteResult<T>>,
    {
        let actor = self.actor()?;
        match call(actor).await {
            Ok(value) => {
                self.gateway.record_success();
                for family in invalidates {
                    self.cache.invalidate(*family);
                }
                Ok(value)
            }
            Err(err) => Err(ClientError::Remote(self.fail(&err, context))),
        }
    }

    // -- Reads --

    pub async fn caller_profile(&self) -> Result<Option<UserProfile>> {
        self.query(QueryKey::CurrentUserProfile, "get_caller_user_profile", |actor| async move {
            actor.get_caller_user_profile().await
        })
        .await
    }

    /// Another user's profile. Resolves to `None` when blocking or
    /// authorization hides it.
    pub async fn user_profile(&self, user: &Principal) -> Result<Option<UserProfile>> {
        let target = user.clone();
        self.query_or(
            QueryKey::Profile(user.clone()),
            "get_user_profile",
            |actor| async move { actor.get_user_profile(target).await },
            |err| {
                let hidden = err.kind.as_ref().map_or(false, |k| k.hides_content());
                hidden.then_some(None)
            },
        )
        .await
    }

    pub async fn feed(&self) -> Result<Vec<FeedPost>> {
        self.query(QueryKey::Feed, "get_feed", |actor| async move {
            actor.get_feed().await
        })
        .await
    }

    pub async fn user_posts(&self, user: &Principal) -> Result<Vec<FeedPost>> {
        let target = user.clone();
        self.query(QueryKey::UserPosts(user.clone()), "get_user_posts", |actor| async move {
            actor.get_user_posts(target).await
        })
        .await
    }

    pub async fn friends(&self, user: &Principal) -> Result<Vec<Principal>> {
        let target = user.clone();
        self.query(QueryKey::Friends(user.clone()), "get_friends", |actor| async move {
            actor.get_friends(target).await
        })
        .await
    }

    pub async fn pending_requests(&self) -> Result<Vec<FriendRequest>> {
        self.query(QueryKey::PendingRequests, "get_pending_requests", |actor| async move {
            actor.get_pending_requests().await
        })
        .await
    }

    pub async fn blocked_users(&self) -> Result<Vec<Principal>> {
        self.query(QueryKey::BlockedUsers, "get_blocked_users", |actor| async move {
            actor.get_blocked_users().await
        })
        .await
    }

    /// Whether the caller has blocked `user`. Any failure reads as `false`.
    pub async fn is_user_blocked(&self, user: &Principal) -> Result<bool> {
        let target = user.clone();
        self.query_or(
            QueryKey::IsBlocked(user.clone()),
            "is_user_blocked",
            |actor| async move { actor.is_user_blocked(target).await },
            |err| {
                warn!(user = %user, error = %err, "Error checking block status");
                Some(false)
            },
        )
        .await
    }

    pub async fn reports(&self) -> Result<Vec<(PostId, Vec<Report>)>> {
        self.query(QueryKey::Reports, "get_reports", |actor| async move {
            actor.get_reports().await
        })
        .await
    }

    pub async fn caller_role(&self) -> Result<UserRole> {
        self.query(QueryKey::CallerRole, "get_caller_user_role", |actor| async move {
            actor.get_caller_user_role().await
        })
        .await
    }

    pub async fn is_caller_admin(&self) -> Result<bool> {
        self.query(QueryKey::IsAdmin, "is_caller_admin", |actor| async move {
            actor.is_caller_admin().await
        })
        .await
    }

    // -- Mutations --

    pub async fn verify_age_and_create_profile(&self, profile: UserProfile) -> Result<()> {
        self.mutate("verify_age_and_create_profile", PROFILE_MUTATION, |actor| async move {
            actor.verify_age_and_create_profile(profile).await
        })
        .await?;
        info!("Profile created");
        Ok(())
    }

    pub async fn save_profile(&self, profile: UserProfile) -> Result<()> {
        self.mutate("save_caller_user_profile", PROFILE_MUTATION, |actor| async move {
            actor.save_caller_user_profile(profile).await
        })
        .await
    }

    pub async fn update_profile(&self, profile: UserProfile) -> Result<()> {
        self.mutate("update_profile", PROFILE_MUTATION, |actor| async move {
            actor.update_profile(profile).await
        })
        .await
    }

    pub async fn create_post(&self, content: String) -> Result<PostId> {
        let id = self
            .mutate("create_post", POST_MUTATION, |actor| async move {
                actor.create_post(content).await
            })
            .await?;
        info!(post_id = %id, "Post created");
        Ok(id)
    }

    pub async fn like_post(&self, post_id: PostId) -> Result<()> {
        self.mutate("like_post", POST_MUTATION, |actor| async move {
            actor.like_post(post_id).await
        })
        .await
    }

    pub async fn delete_post(&self, post_id: PostId) -> Result<()> {
        self.mutate("delete_post", POST_MUTATION, |actor| async move {
            actor.delete_post(post_id).await
        })
        .await?;
        info!(post_id = %post_id, "Post deleted");
        Ok(())
    }

    pub async fn send_friend_request(&self, to: Principal) -> Result<()> {
        self.mutate("send_friend_request", FRIEND_REQUEST_SENT, |actor| async move {
            actor.send_friend_request(to).await
        })
        .await
    }

    pub async fn respond_to_friend_request(&self, from: Principal, accept: bool) -> Result<()> {
        self.mutate(
            "respond_to_friend_request",
            FRIEND_REQUEST_ANSWERED,
            |actor| async move { actor.respond_to_friend_request(from, accept).await },
        )
        .await
    }

    pub async fn report_content(
        &self,
        reported_user: Option<Principal>,
        reported_post: Option<PostId>,
        reason: String,
    ) -> Result<()> {
        self.mutate("report_content", &[], |actor| async move {
            actor
                .report_content(reported_user, reported_post, reason)
                .await
        })
        .await
    }

    pub async fn block_user(&self, target: Principal) -> Result<()> {
        let who = target.clone();
        self.mutate("block_user", USER_BLOCKED, |actor| async move {
            actor.block_user(target).await
        })
        .await?;
        info!(user = %who, "User blocked");
        Ok(())
    }

    pub async fn unblock_user(&self, target: Principal) -> Result<()> {
        self.mutate("unblock_user", USER_UNBLOCKED, |actor| async move {
            actor.unblock_user(target).await
        })
        .await
    }

    pub async fn assign_user_role(&self, user: Principal, role: UserRole) -> Result<()> {
        self.mutate("assign_caller_user_role", ROLE_ASSIGNED, |actor| async move {
            actor.assign_caller_user_role(user, role).await
        })
        .await
    }

    /// Delete the caller's account. Everything cached belonged to it, so the
    /// whole cache goes.
    pub async fn delete_own_account(&self) -> Result<()> {
        self.mutate("delete_own_account", &[], |actor| async move {
            actor.delete_own_account().await
        })
        .await?;
        self.cache.clear();
        info!("Account deleted");
        Ok(())
    }
}
