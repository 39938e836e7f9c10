//! A single post in the feed and the actions available on it.

use chrono::{DateTime, Utc};
use metalhead_shared::{FeedPost, Principal};

use super::report::ReportDialog;
use super::{toast_failure, Confirm, Pending};
use crate::error::{ClientError, Result};
use crate::state::AppState;

pub const DELETE_PROMPT: &str = "Are you sure you want to delete this post?";
pub const BLOCK_PROMPT: &str =
    "Are you sure you want to block this user? You will no longer see their posts.";

const AUTHOR_PREFIX_LEN: usize = 8;

#[derive(Clone)]
pub struct PostCard {
    state: AppState,
    post: FeedPost,
    viewer: Option<Principal>,
    author_blocked: bool,
    liking: Pending,
    deleting: Pending,
    requesting: Pending,
    blocking: Pending,
}

impl PostCard {
    /// `blocked` is the viewer's block list, used to pick block vs unblock.
    pub fn new(
        state: AppState,
        post: FeedPost,
        viewer: Option<Principal>,
        blocked: &[Principal],
    ) -> Self {
        let author_blocked = blocked.contains(&post.author);
        Self {
            state,
            post,
            viewer,
            author_blocked,
            liking: Pending::default(),
            deleting: Pending::default(),
            requesting: Pending::default(),
            blocking: Pending::default(),
        }
    }

    pub fn post(&self) -> &FeedPost {
        &self.post
    }

    pub fn is_own_post(&self) -> bool {
        self.viewer.as_ref() == Some(&self.post.author)
    }

    pub fn has_liked(&self) -> bool {
        self.viewer
            .as_ref()
            .map_or(false, |viewer| self.post.has_liked(viewer))
    }

    pub fn is_author_blocked(&self) -> bool {
        self.author_blocked
    }

    pub fn author_label(&self) -> String {
        format!("{}...", self.post.author.short(AUTHOR_PREFIX_LEN))
    }

    pub fn timestamp_label(&self, now: DateTime<Utc>) -> String {
        self.post.timestamp.relative_to(now)
    }

    pub fn like_count(&self) -> usize {
        self.post.like_count()
    }

    pub fn can_like(&self) -> bool {
        !self.liking.is_pending() && !self.has_liked()
    }

    pub fn can_delete(&self) -> bool {
        self.is_own_post() && !self.deleting.is_pending()
    }

    pub fn is_blocking(&self) -> bool {
        self.blocking.is_pending()
    }

    pub fn is_requesting(&self) -> bool {
        self.requesting.is_pending()
    }

    pub async fn like(&self) -> Result<()> {
        let _pending = self.liking.start();
        self.state
            .data
            .like_post(self.post.id)
            .await
            .map_err(|err| self.failed(err, "Failed to like post"))
    }

    /// Delete the post after the user confirms. Returns `false` when they
    /// declined.
    pub async fn delete(&self, confirm: &dyn Confirm) -> Result<bool> {
        if !confirm.confirm(DELETE_PROMPT) {
            return Ok(false);
        }
        let _pending = self.deleting.start();
        self.state
            .data
            .delete_post(self.post.id)
            .await
            .map_err(|err| self.failed(err, "Failed to delete post"))?;
        self.state.notifier.success("Post deleted");
        Ok(true)
    }

    pub async fn send_friend_request(&self) -> Result<()> {
        let _pending = self.requesting.start();
        self.state
            .data
            .send_friend_request(self.post.author.clone())
            .await
            .map_err(|err| self.failed(err, "Failed to send friend request"))?;
        self.state.notifier.success("Friend request sent");
        Ok(())
    }

    /// Block the author after the user confirms. Returns `false` when they
    /// declined.
    pub async fn block(&self, confirm: &dyn Confirm) -> Result<bool> {
        if !confirm.confirm(BLOCK_PROMPT) {
            return Ok(false);
        }
        let _pending = self.blocking.start();
        self.state
            .data
            .block_user(self.post.author.clone())
            .await
            .map_err(|err| self.failed(err, "Failed to block user"))?;
        self.state.notifier.success("User blocked");
        Ok(true)
    }

    pub async fn unblock(&self) -> Result<()> {
        let _pending = self.blocking.start();
        self.state
            .data
            .unblock_user(self.post.author.clone())
            .await
            .map_err(|err| self.failed(err, "Failed to unblock user"))?;
        self.state.notifier.success("User unblocked");
        Ok(())
    }

    /// Report dialog preset to this post and its author.
    pub fn report_dialog(&self) -> ReportDialog {
        ReportDialog::new(
            self.state.clone(),
            Some(self.post.author.clone()),
            Some(self.post.id),
        )
    }

    fn failed(&self, err: ClientError, fallback: &str) -> ClientError {
        toast_failure(&self.state.notifier, &err, fallback);
        err
    }
}
