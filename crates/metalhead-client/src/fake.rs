//! In-memory [`Backend`] used by tests and local demos.
//!
//! Implements the contract with a small subset of the real actor's rules
//! (ownership, blocking, duplicate checks) and rejects with the same
//! messages. Failures and latency can be injected per call, and every call
//! is counted per method.

use std::collections::{BTreeMap, BTreeSet, HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use metalhead_shared::constants::MAX_POST_LENGTH;
use metalhead_shared::validation::validate_display_name;
use metalhead_shared::{
    BlockedScope, ErrorKind, FeedPost, FriendRequest, FriendRequestStatus, PostId, Principal,
    Report, Time, UserProfile, UserRole, ValidationError, ValidationIssue,
};

use crate::backend::{Backend, RemoteResult};
use crate::error::RemoteError;

#[derive(Default)]
struct World {
    profiles: HashMap<Principal, UserProfile>,
    posts: BTreeMap<PostId, FeedPost>,
    next_post_id: u64,
    friends: HashMap<Principal, BTreeSet<Principal>>,
    requests: Vec<FriendRequest>,
    blocks: HashMap<Principal, BTreeSet<Principal>>,
    reports: Vec<Report>,
    roles: HashMap<Principal, UserRole>,
}

impl World {
    fn blocked_either_way(&self, a: &Principal, b: &Principal) -> bool {
        let blocks = |x: &Principal, y: &Principal| {
            self.blocks.get(x).map_or(false, |set| set.contains(y))
        };
        blocks(a, b) || blocks(b, a)
    }

    fn role_of(&self, who: &Principal) -> UserRole {
        match self.roles.get(who) {
            Some(role) => *role,
            None if self.profiles.contains_key(who) => UserRole::User,
            None => UserRole::Guest,
        }
    }
}

#[derive(Default)]
struct Faults {
    failures: VecDeque<RemoteError>,
    delays: VecDeque<Duration>,
    calls: HashMap<&'static str, usize>,
}

pub struct MemoryBackend {
    caller: Mutex<Principal>,
    structured_errors: bool,
    world: Mutex<World>,
    faults: Mutex<Faults>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

impl MemoryBackend {
    pub fn new(caller: Principal) -> Self {
        Self {
            caller: Mutex::new(caller),
            structured_errors: false,
            world: Mutex::new(World::default()),
            faults: Mutex::new(Faults::default()),
        }
    }

    /// Reject with structured [`ErrorKind`]s instead of text only.
    pub fn with_structured_errors(mut self) -> Self {
        self.structured_errors = true;
        self
    }

    /// Act as a different signed-in user from now on.
    pub fn set_caller(&self, caller: Principal) {
        *lock(&self.caller) = caller;
    }

    pub fn caller(&self) -> Principal {
        lock(&self.caller).clone()
    }

    pub fn set_role(&self, who: Principal, role: UserRole) {
        lock(&self.world).roles.insert(who, role);
    }

    /// Seed a profile directly, bypassing validation.
    pub fn insert_profile(&self, who: Principal, profile: UserProfile) {
        lock(&self.world).profiles.insert(who, profile);
    }

    /// Fail the next call (of any method) with `err`. Queued failures are
    /// consumed in order.
    pub fn fail_next(&self, err: RemoteError) {
        lock(&self.faults).failures.push_back(err);
    }

    /// Delay the next call by `delay`. Queued delays are consumed in order.
    pub fn delay_next(&self, delay: Duration) {
        lock(&self.faults).delays.push_back(delay);
    }

    /// Number of calls made to `method` (contract name, e.g. `"get_feed"`).
    pub fn calls(&self, method: &str) -> usize {
        lock(&self.faults).calls.get(method).copied().unwrap_or(0)
    }

    pub fn total_calls(&self) -> usize {
        lock(&self.faults).calls.values().sum()
    }

    async fn enter(&self, method: &'static str) -> RemoteResult<Principal> {
        let (delay, failure) = {
            let mut faults = lock(&self.faults);
            *faults.calls.entry(method).or_insert(0) += 1;
            (faults.delays.pop_front(), faults.failures.pop_front())
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        match failure {
            Some(err) => Err(err),
            None => Ok(self.caller()),
        }
    }

    fn reject(&self, kind: ErrorKind, message: impl Into<String>) -> RemoteError {
        if self.structured_errors {
            RemoteError::rejected(kind, message)
        } else {
            RemoteError::legacy(message)
        }
    }

    fn check_profile(&self, profile: &UserProfile) -> RemoteResult<()> {
        match validate_display_name(&profile.display_name) {
            Ok(()) => Ok(()),
            Err(ValidationError::DisplayNameInvalidCharacter(c)) => Err(self.reject(
                ErrorKind::Validation(ValidationIssue::DisplayNameInvalidCharacter(Some(c))),
                format!(
                    "Display name contains invalid character: '{c}'. Allowed characters: A-Z, a-z, 0-9, -"
                ),
            )),
            Err(_) => Err(self.reject(
                ErrorKind::Validation(ValidationIssue::DisplayNameLength),
                "Display name must be between 5 and 50 characters",
            )),
        }
    }

    fn require_profile(&self, world: &World, caller: &Principal, action: &str) -> RemoteResult<()> {
        if world.profiles.contains_key(caller) {
            Ok(())
        } else {
            Err(self.reject(
                ErrorKind::Unauthorized,
                format!("Unauthorized: Only users can {action}"),
            ))
        }
    }

    fn require_admin(&self, world: &World, caller: &Principal) -> RemoteResult<()> {
        if world.role_of(caller) == UserRole::Admin {
            Ok(())
        } else {
            Err(self.reject(
                ErrorKind::Unauthorized,
                "Unauthorized: Only admins can perform this action",
            ))
        }
    }

    fn blocked(&self, scope: BlockedScope, message: &str) -> RemoteError {
        self.reject(ErrorKind::Blocked(scope), message)
    }
}

#[async_trait]
impl Backend for MemoryBackend {
    async fn assign_caller_user_role(&self, user: Principal, role: UserRole) -> RemoteResult<()> {
        let caller = self.enter("assign_caller_user_role").await?;
        let mut world = lock(&self.world);
        self.require_admin(&world, &caller)?;
        world.roles.insert(user, role);
        Ok(())
    }

    async fn block_user(&self, target: Principal) -> RemoteResult<()> {
        let caller = self.enter("block_user").await?;
        let mut world = lock(&self.world);
        if target == caller {
            return Err(RemoteError::legacy("Cannot block yourself"));
        }
        world.blocks.entry(caller.clone()).or_default().insert(target.clone());
        if let Some(set) = world.friends.get_mut(&caller) {
            set.remove(&target);
        }
        if let Some(set) = world.friends.get_mut(&target) {
            set.remove(&caller);
        }
        world.requests.retain(|r| {
            !((r.from == caller && r.to == target) || (r.from == target && r.to == caller))
        });
        Ok(())
    }

    async fn create_post(&self, content: String) -> RemoteResult<PostId> {
        let caller = self.enter("create_post").await?;
        let mut world = lock(&self.world);
        self.require_profile(&world, &caller, "post")?;
        if content.trim().is_empty() {
            return Err(self.reject(
                ErrorKind::Validation(ValidationIssue::ContentEmpty),
                "Content cannot be empty",
            ));
        }
        if content.chars().count() > MAX_POST_LENGTH {
            return Err(self.reject(
                ErrorKind::Validation(ValidationIssue::ContentTooLong),
                "Content is too long",
            ));
        }
        world.next_post_id += 1;
        let id = PostId(world.next_post_id);
        world.posts.insert(
            id,
            FeedPost {
                id,
                author: caller,
                content,
                likes: Vec::new(),
                timestamp: Time::now(),
            },
        );
        Ok(id)
    }

    async fn delete_own_account(&self) -> RemoteResult<()> {
        let caller = self.enter("delete_own_account").await?;
        let mut world = lock(&self.world);
        world.profiles.remove(&caller);
        world.posts.retain(|_, p| p.author != caller);
        for post in world.posts.values_mut() {
            post.likes.retain(|p| *p != caller);
        }
        world.friends.remove(&caller);
        for set in world.friends.values_mut() {
            set.remove(&caller);
        }
        world.requests.retain(|r| r.from != caller && r.to != caller);
        world.blocks.remove(&caller);
        world.reports.retain(|r| r.reporter != caller);
        world.roles.remove(&caller);
        Ok(())
    }

    async fn delete_post(&self, post_id: PostId) -> RemoteResult<()> {
        let caller = self.enter("delete_post").await?;
        let mut world = lock(&self.world);
        let author = match world.posts.get(&post_id) {
            Some(post) => post.author.clone(),
            None => {
                return Err(self.reject(ErrorKind::NotFound, "Post does not exist"));
            }
        };
        if author != caller && world.role_of(&caller) != UserRole::Admin {
            return Err(self.reject(
                ErrorKind::Unauthorized,
                "Unauthorized: Can only delete your own posts",
            ));
        }
        world.posts.remove(&post_id);
        Ok(())
    }

    async fn get_blocked_users(&self) -> RemoteResult<Vec<Principal>> {
        let caller = self.enter("get_blocked_users").await?;
        let world = lock(&self.world);
        Ok(world
            .blocks
            .get(&caller)
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default())
    }

    async fn get_caller_user_profile(&self) -> RemoteResult<Option<UserProfile>> {
        let caller = self.enter("get_caller_user_profile").await?;
        Ok(lock(&self.world).profiles.get(&caller).cloned())
    }

    async fn get_caller_user_role(&self) -> RemoteResult<UserRole> {
        let caller = self.enter("get_caller_user_role").await?;
        Ok(lock(&self.world).role_of(&caller))
    }

    async fn get_feed(&self) -> RemoteResult<Vec<FeedPost>> {
        let caller = self.enter("get_feed").await?;
        let world = lock(&self.world);
        Ok(world
            .posts
            .values()
            .rev()
            .filter(|p| !world.blocked_either_way(&caller, &p.author))
            .cloned()
            .collect())
    }

    async fn get_friends(&self, user: Principal) -> RemoteResult<Vec<Principal>> {
        let caller = self.enter("get_friends").await?;
        let world = lock(&self.world);
        if world.blocked_either_way(&caller, &user) {
            return Err(self.blocked(
                BlockedScope::ViewFriends,
                "Cannot view friends: user is blocked",
            ));
        }
        Ok(world
            .friends
            .get(&user)
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default())
    }

    async fn get_pending_requests(&self) -> RemoteResult<Vec<FriendRequest>> {
        let caller = self.enter("get_pending_requests").await?;
        let world = lock(&self.world);
        Ok(world
            .requests
            .iter()
            .filter(|r| r.to == caller && r.status == FriendRequestStatus::Pending)
            .cloned()
            .collect())
    }

    async fn get_reports(&self) -> RemoteResult<Vec<(PostId, Vec<Report>)>> {
        let caller = self.enter("get_reports").await?;
        let world = lock(&self.world);
        self.require_admin(&world, &caller)?;
        let mut grouped: BTreeMap<PostId, Vec<Report>> = BTreeMap::new();
        for report in &world.reports {
            if let Some(post) = report.reported_post {
                grouped.entry(post).or_default().push(report.clone());
            }
        }
        Ok(grouped.into_iter().collect())
    }

    async fn get_user_posts(&self, user: Principal) -> RemoteResult<Vec<FeedPost>> {
        let caller = self.enter("get_user_posts").await?;
        let world = lock(&self.world);
        if world.blocked_either_way(&caller, &user) {
            return Err(self.blocked(
                BlockedScope::ViewPosts,
                "Cannot view posts: user is blocked",
            ));
        }
        Ok(world
            .posts
            .values()
            .rev()
            .filter(|p| p.author == user)
            .cloned()
            .collect())
    }

    async fn get_user_profile(&self, user: Principal) -> RemoteResult<Option<UserProfile>> {
        let caller = self.enter("get_user_profile").await?;
        let world = lock(&self.world);
        if world.blocked_either_way(&caller, &user) {
            return Err(self.blocked(
                BlockedScope::ViewProfile,
                "Cannot view profile: user is blocked",
            ));
        }
        Ok(world.profiles.get(&user).cloned())
    }

    async fn is_caller_admin(&self) -> RemoteResult<bool> {
        let caller = self.enter("is_caller_admin").await?;
        Ok(lock(&self.world).role_of(&caller) == UserRole::Admin)
    }

    async fn is_user_blocked(&self, target: Principal) -> RemoteResult<bool> {
        let caller = self.enter("is_user_blocked").await?;
        let world = lock(&self.world);
        Ok(world
            .blocks
            .get(&caller)
            .map_or(false, |set| set.contains(&target)))
    }

    async fn like_post(&self, post_id: PostId) -> RemoteResult<()> {
        let caller = self.enter("like_post").await?;
        let mut world = lock(&self.world);
        self.require_profile(&world, &caller, "like posts")?;
        let author = match world.posts.get(&post_id) {
            Some(post) => post.author.clone(),
            None => return Err(self.reject(ErrorKind::NotFound, "Post does not exist")),
        };
        if world.blocked_either_way(&caller, &author) {
            return Err(self.blocked(BlockedScope::LikePost, "Cannot like post: user is blocked"));
        }
        let already_liked = world
            .posts
            .get(&post_id)
            .map_or(false, |post| post.has_liked(&caller));
        if already_liked {
            return Err(self.reject(ErrorKind::PostAlreadyLiked, "Post already liked"));
        }
        if let Some(post) = world.posts.get_mut(&post_id) {
            post.likes.push(caller);
        }
        Ok(())
    }

    async fn report_content(
        &self,
        reported_user: Option<Principal>,
        reported_post: Option<PostId>,
        reason: String,
    ) -> RemoteResult<()> {
        let caller = self.enter("report_content").await?;
        if reason.trim().is_empty() {
            return Err(self.reject(
                ErrorKind::Validation(ValidationIssue::ReasonEmpty),
                "Reason cannot be empty",
            ));
        }
        lock(&self.world).reports.push(Report {
            reported_post,
            reported_user,
            reason,
            reporter: caller,
            timestamp: Time::now(),
        });
        Ok(())
    }

    async fn respond_to_friend_request(&self, from: Principal, accept: bool) -> RemoteResult<()> {
        let caller = self.enter("respond_to_friend_request").await?;
        let mut world = lock(&self.world);
        if world.blocked_either_way(&caller, &from) {
            return Err(self.blocked(
                BlockedScope::RespondToFriendRequest,
                "Cannot respond to friend request: user is blocked",
            ));
        }
        let request = world.requests.iter_mut().find(|r| {
            r.from == from && r.to == caller && r.status == FriendRequestStatus::Pending
        });
        let Some(request) = request else {
            return Err(self.reject(ErrorKind::NotFound, "Friend request does not exist"));
        };
        request.status = if accept {
            FriendRequestStatus::Accepted
        } else {
            FriendRequestStatus::Rejected
        };
        if accept {
            world.friends.entry(caller.clone()).or_default().insert(from.clone());
            world.friends.entry(from).or_default().insert(caller);
        }
        Ok(())
    }

    async fn save_caller_user_profile(&self, profile: UserProfile) -> RemoteResult<()> {
        let caller = self.enter("save_caller_user_profile").await?;
        self.check_profile(&profile)?;
        lock(&self.world).profiles.insert(caller, profile);
        Ok(())
    }

    async fn send_friend_request(&self, to: Principal) -> RemoteResult<()> {
        let caller = self.enter("send_friend_request").await?;
        let mut world = lock(&self.world);
        self.require_profile(&world, &caller, "send friend requests")?;
        if to == caller {
            return Err(RemoteError::legacy("Cannot send friend request to yourself"));
        }
        if world.blocked_either_way(&caller, &to) {
            return Err(self.blocked(
                BlockedScope::SendFriendRequest,
                "Cannot send friend request: user is blocked",
            ));
        }
        let duplicate = world.requests.iter().any(|r| {
            r.from == caller && r.to == to && r.status == FriendRequestStatus::Pending
        });
        if duplicate {
            return Err(RemoteError::legacy("Friend request already sent"));
        }
        world.requests.push(FriendRequest {
            from: caller,
            to,
            status: FriendRequestStatus::Pending,
            timestamp: Time::now(),
        });
        Ok(())
    }

    async fn unblock_user(&self, target: Principal) -> RemoteResult<()> {
        let caller = self.enter("unblock_user").await?;
        if let Some(set) = lock(&self.world).blocks.get_mut(&caller) {
            set.remove(&target);
        }
        Ok(())
    }

    async fn update_profile(&self, profile: UserProfile) -> RemoteResult<()> {
        let caller = self.enter("update_profile").await?;
        self.check_profile(&profile)?;
        let mut world = lock(&self.world);
        match world.profiles.get_mut(&caller) {
            Some(existing) => {
                *existing = profile;
                Ok(())
            }
            None => Err(self.reject(ErrorKind::NotFound, "Profile does not exist")),
        }
    }

    async fn verify_age_and_create_profile(&self, profile: UserProfile) -> RemoteResult<()> {
        let caller = self.enter("verify_age_and_create_profile").await?;
        if !profile.is_age_verified {
            return Err(self.reject(
                ErrorKind::AgeVerificationRequired,
                "Age verification required",
            ));
        }
        self.check_profile(&profile)?;
        let mut world = lock(&self.world);
        if world.profiles.contains_key(&caller) {
            return Err(self.reject(ErrorKind::ProfileAlreadyExists, "Profile already exists"));
        }
        world.profiles.insert(caller, profile);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn principal(text: &str) -> Principal {
        Principal::from_text(text).unwrap()
    }

    fn profile(name: &str) -> UserProfile {
        UserProfile {
            display_name: name.to_string(),
            bio: String::new(),
            favorite_genres: Vec::new(),
            favorite_bands: Vec::new(),
            is_age_verified: true,
            avatar_url: None,
            location: None,
        }
    }

    #[tokio::test]
    async fn test_posting_requires_profile() {
        let backend = MemoryBackend::new(principal("alice"));
        let err = backend.create_post("hello".into()).await.unwrap_err();
        assert!(err.message().starts_with("Unauthorized"));

        backend.verify_age_and_create_profile(profile("alice-01")).await.unwrap();
        let id = backend.create_post("hello".into()).await.unwrap();
        assert_eq!(backend.get_feed().await.unwrap()[0].id, id);
        assert_eq!(backend.calls("create_post"), 2);
    }

    #[tokio::test]
    async fn test_block_hides_feed_and_drops_requests() {
        let backend = MemoryBackend::new(principal("bob"));
        backend.verify_age_and_create_profile(profile("bob-the-drummer")).await.unwrap();
        backend.create_post("blast beats".into()).await.unwrap();
        backend.send_friend_request(principal("alice")).await.unwrap();

        backend.set_caller(principal("alice"));
        assert_eq!(backend.get_pending_requests().await.unwrap().len(), 1);
        backend.block_user(principal("bob")).await.unwrap();

        assert!(backend.get_feed().await.unwrap().is_empty());
        assert!(backend.get_pending_requests().await.unwrap().is_empty());
        assert!(backend.is_user_blocked(principal("bob")).await.unwrap());
    }

    #[tokio::test]
    async fn test_injected_failure_consumed_once() {
        let backend = MemoryBackend::new(principal("alice"));
        backend.fail_next(RemoteError::Gateway("Failed to fetch".into()));

        assert!(backend.get_feed().await.is_err());
        assert!(backend.get_feed().await.is_ok());
        assert_eq!(backend.total_calls(), 2);
    }

    #[tokio::test]
    async fn test_structured_rejections() {
        let backend = MemoryBackend::new(principal("alice")).with_structured_errors();
        backend.verify_age_and_create_profile(profile("alice-01")).await.unwrap();
        let err = backend
            .verify_age_and_create_profile(profile("alice-01"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), Some(&ErrorKind::ProfileAlreadyExists));
    }
}
