//! Service behaviour over the in-memory store.

use std::sync::Arc;

use quill_core::DomainError;
use quill_core::domain::{Group, Post, User};
use quill_core::forms::{
    CommentSubmission, FormOutcome, GroupSubmission, INVALID_CHOICE, INVALID_IMAGE,
    PostSubmission, REQUIRED, SignupSubmission, Upload,
};
use quill_core::ports::{BaseRepository, FeedFilter};
use quill_core::services::{
    AccountService, CommentService, EditOutcome, FeedService, FollowOutcome, FollowService,
    GroupService, PostService, Repositories,
};
use quill_infra::{Argon2PasswordService, ImagesizeProbe, InMemoryStore, LocalMediaStorage};
use tempfile::TempDir;
use uuid::Uuid;

const SMALL_GIF: &[u8] = &[
    0x47, 0x49, 0x46, 0x38, 0x39, 0x61, 0x02, 0x00, 0x01, 0x00, 0x80, 0x00, 0x00, 0x00, 0x00, 0x00,
    0xFF, 0xFF, 0xFF, 0x21, 0xF9, 0x04, 0x00, 0x00, 0x00, 0x00, 0x00, 0x2C, 0x00, 0x00, 0x00, 0x00,
    0x02, 0x00, 0x01, 0x00, 0x00, 0x02, 0x02, 0x0C, 0x0A, 0x00, 0x3B,
];

struct Fixture {
    media_root: TempDir,
    repos: Repositories,
    accounts: AccountService,
    groups: GroupService,
    posts: PostService,
    comments: CommentService,
    follows: FollowService,
    feed: FeedService,
}

impl Fixture {
    fn new() -> Self {
        let media_root = tempfile::tempdir().unwrap();
        let repos = Repositories::from_store(Arc::new(InMemoryStore::new()));
        let media = Arc::new(LocalMediaStorage::new(media_root.path()).unwrap());

        Self {
            accounts: AccountService::new(repos.clone(), Arc::new(Argon2PasswordService::new())),
            groups: GroupService::new(repos.clone()),
            posts: PostService::new(repos.clone(), media, Arc::new(ImagesizeProbe)),
            comments: CommentService::new(repos.clone()),
            follows: FollowService::new(repos.clone()),
            feed: FeedService::new(repos.clone()),
            repos,
            media_root,
        }
    }

    async fn user(&self, username: &str) -> User {
        let outcome = self
            .accounts
            .signup(&SignupSubmission {
                username: username.to_string(),
                password: "s3cret-pass".to_string(),
            })
            .await
            .unwrap();
        match outcome {
            FormOutcome::Saved(user) => user,
            FormOutcome::Invalid(errors) => panic!("signup failed: {errors:?}"),
        }
    }

    async fn group(&self, title: &str, slug: &str) -> Group {
        let outcome = self
            .groups
            .create(&GroupSubmission {
                title: title.to_string(),
                slug: slug.to_string(),
                description: String::new(),
            })
            .await
            .unwrap();
        match outcome {
            FormOutcome::Saved(group) => group,
            FormOutcome::Invalid(errors) => panic!("group failed: {errors:?}"),
        }
    }

    async fn post(&self, author: &User, text: &str, group: Option<&Group>) -> Post {
        let outcome = self
            .posts
            .create(author.id, &submission(text, group))
            .await
            .unwrap();
        match outcome {
            FormOutcome::Saved(post) => post,
            FormOutcome::Invalid(errors) => panic!("post failed: {errors:?}"),
        }
    }

    async fn count(&self) -> u64 {
        self.repos.posts.count(FeedFilter::All).await.unwrap()
    }

    fn stored_files(&self) -> usize {
        std::fs::read_dir(self.media_root.path().join("posts"))
            .map(|entries| entries.count())
            .unwrap_or(0)
    }
}

fn submission(text: &str, group: Option<&Group>) -> PostSubmission {
    PostSubmission {
        text: Some(text.to_string()),
        group: group.map(|g| g.id.to_string()),
        image: None,
    }
}

#[tokio::test]
async fn test_valid_post_is_saved_once() {
    let fx = Fixture::new();
    let tester = fx.user("tester").await;
    let group = fx.group("Test group", "test-slug").await;

    let post = fx.post(&tester, "Новый пост", Some(&group)).await;

    assert_eq!(fx.count().await, 1);
    assert_eq!(post.text, "Новый пост");
    assert_eq!(post.author_id, tester.id);
    assert_eq!(post.group_id, Some(group.id));

    let home = fx.feed.home(None).await.unwrap();
    assert_eq!(home.items[0].id, post.id);
    assert_eq!(home.items[0].author.username, "tester");
}

#[tokio::test]
async fn test_blank_text_is_rejected() {
    let fx = Fixture::new();
    let tester = fx.user("tester").await;

    let outcome = fx
        .posts
        .create(tester.id, &submission("   ", None))
        .await
        .unwrap();

    let FormOutcome::Invalid(errors) = outcome else {
        panic!("expected form errors");
    };
    assert_eq!(errors.field("text"), [REQUIRED]);
    assert_eq!(fx.count().await, 0);
}

#[tokio::test]
async fn test_unknown_or_malformed_group_is_rejected() {
    let fx = Fixture::new();
    let tester = fx.user("tester").await;

    for group in ["999", "cats"] {
        let outcome = fx
            .posts
            .create(
                tester.id,
                &PostSubmission {
                    text: Some("hello".to_string()),
                    group: Some(group.to_string()),
                    image: None,
                },
            )
            .await
            .unwrap();

        let FormOutcome::Invalid(errors) = outcome else {
            panic!("expected form errors for {group}");
        };
        assert_eq!(errors.field("group"), [INVALID_CHOICE]);
    }
    assert_eq!(fx.count().await, 0);
}

#[tokio::test]
async fn test_non_image_upload_is_rejected() {
    let fx = Fixture::new();
    let tester = fx.user("tester").await;

    let outcome = fx
        .posts
        .create(
            tester.id,
            &PostSubmission {
                text: Some("with file".to_string()),
                group: None,
                image: Some(Upload {
                    filename: "notes.png".to_string(),
                    bytes: b"this is plain text".to_vec(),
                }),
            },
        )
        .await
        .unwrap();

    let FormOutcome::Invalid(errors) = outcome else {
        panic!("expected form errors");
    };
    assert_eq!(errors.field("image"), [INVALID_IMAGE]);
    assert_eq!(fx.count().await, 0);
    assert_eq!(fx.stored_files(), 0);
}

#[tokio::test]
async fn test_image_upload_is_stored() {
    let fx = Fixture::new();
    let tester = fx.user("tester").await;

    let outcome = fx
        .posts
        .create(
            tester.id,
            &PostSubmission {
                text: Some("with picture".to_string()),
                group: None,
                image: Some(Upload {
                    filename: "small.gif".to_string(),
                    bytes: SMALL_GIF.to_vec(),
                }),
            },
        )
        .await
        .unwrap();

    let FormOutcome::Saved(post) = outcome else {
        panic!("expected saved post");
    };
    let image = post.image.unwrap();
    assert!(image.starts_with("posts/"));
    assert!(image.ends_with(".gif"));
    assert!(fx.media_root.path().join(&image).exists());
}

#[tokio::test]
async fn test_edit_moves_post_between_groups() {
    let fx = Fixture::new();
    let tester = fx.user("tester").await;
    let old = fx.group("Old", "old").await;
    let new = fx.group("New", "new").await;
    let post = fx.post(&tester, "before", Some(&old)).await;

    let outcome = fx
        .posts
        .update(tester.id, post.clone(), &submission("after", Some(&new)))
        .await
        .unwrap();
    let EditOutcome::Saved(edited) = outcome else {
        panic!("expected saved edit");
    };
    assert_eq!(edited.pub_date, post.pub_date);

    let old_feed = fx.feed.group("old", None).await.unwrap();
    assert_eq!(old_feed.page.count, 0);

    let new_feed = fx.feed.group("new", None).await.unwrap();
    assert_eq!(new_feed.page.items[0].text, "after");

    let profile = fx.feed.profile("tester", None, None).await.unwrap();
    assert_eq!(profile.page.items[0].text, "after");

    let home = fx.feed.home(None).await.unwrap();
    assert_eq!(home.items[0].group.as_ref().unwrap().slug, "new");
    assert_eq!(fx.count().await, 1);
}

#[tokio::test]
async fn test_edit_keeps_image_when_none_submitted() {
    let fx = Fixture::new();
    let tester = fx.user("tester").await;
    let FormOutcome::Saved(post) = fx
        .posts
        .create(
            tester.id,
            &PostSubmission {
                text: Some("pic".to_string()),
                group: None,
                image: Some(Upload {
                    filename: "a.gif".to_string(),
                    bytes: SMALL_GIF.to_vec(),
                }),
            },
        )
        .await
        .unwrap()
    else {
        panic!("expected saved post");
    };

    let EditOutcome::Saved(edited) = fx
        .posts
        .update(tester.id, post.clone(), &submission("pic, edited", None))
        .await
        .unwrap()
    else {
        panic!("expected saved edit");
    };
    assert_eq!(edited.image, post.image);
}

#[tokio::test]
async fn test_edit_by_other_user_is_refused() {
    let fx = Fixture::new();
    let author = fx.user("author").await;
    let intruder = fx.user("intruder").await;
    let post = fx.post(&author, "mine", None).await;

    let outcome = fx
        .posts
        .update(intruder.id, post.clone(), &submission("yours now", None))
        .await
        .unwrap();

    assert!(matches!(outcome, EditOutcome::NotAuthor));
    let stored = fx.posts.find_for_author("author", post.id).await.unwrap();
    assert_eq!(stored.text, "mine");
}

#[tokio::test]
async fn test_post_under_wrong_username_is_not_found() {
    let fx = Fixture::new();
    let author = fx.user("author").await;
    fx.user("other").await;
    let post = fx.post(&author, "mine", None).await;

    let result = fx.feed.post("other", post.id).await;
    assert!(matches!(
        result,
        Err(DomainError::NotFound {
            entity_type: "post",
            ..
        })
    ));
}

#[tokio::test]
async fn test_feed_pages_clamp() {
    let fx = Fixture::new();
    let tester = fx.user("tester").await;
    for i in 0..13 {
        fx.post(&tester, &format!("post {i}"), None).await;
    }

    let first = fx.feed.home(None).await.unwrap();
    assert_eq!(first.items.len(), 10);
    assert_eq!(first.num_pages, 2);
    assert_eq!(first.items[0].text, "post 12");

    let second = fx.feed.home(Some("2")).await.unwrap();
    assert_eq!(second.items.len(), 3);
    assert_eq!(second.items[2].text, "post 0");

    assert_eq!(fx.feed.home(Some("99")).await.unwrap().number, 2);
    assert_eq!(fx.feed.home(Some("0")).await.unwrap().number, 1);
    assert_eq!(fx.feed.home(Some("abc")).await.unwrap().number, 1);
}

#[tokio::test]
async fn test_unknown_group_and_user_are_not_found() {
    let fx = Fixture::new();

    assert!(matches!(
        fx.feed.group("missing", None).await,
        Err(DomainError::NotFound { .. })
    ));
    assert!(matches!(
        fx.feed.profile("nobody", None, None).await,
        Err(DomainError::NotFound { .. })
    ));
}

#[tokio::test]
async fn test_follow_is_idempotent() {
    let fx = Fixture::new();
    let reader = fx.user("reader").await;
    let author = fx.user("author").await;

    assert_eq!(
        fx.follows.follow(reader.id, "author").await.unwrap(),
        FollowOutcome::Created
    );
    assert_eq!(
        fx.follows.follow(reader.id, "author").await.unwrap(),
        FollowOutcome::AlreadyFollowing
    );
    assert_eq!(fx.repos.follows.count_followers(author.id).await.unwrap(), 1);

    let profile = fx
        .feed
        .profile("author", Some(reader.id), None)
        .await
        .unwrap();
    assert!(profile.following);
    assert_eq!(profile.followers_count, 1);

    fx.follows.unfollow(reader.id, "author").await.unwrap();
    assert_eq!(fx.repos.follows.count_followers(author.id).await.unwrap(), 0);

    assert!(matches!(
        fx.follows.unfollow(reader.id, "author").await,
        Err(DomainError::NotFound {
            entity_type: "follow",
            ..
        })
    ));
}

#[tokio::test]
async fn test_self_follow_is_ignored() {
    let fx = Fixture::new();
    let tester = fx.user("tester").await;

    assert_eq!(
        fx.follows.follow(tester.id, "tester").await.unwrap(),
        FollowOutcome::SelfFollow
    );
    assert_eq!(fx.repos.follows.count_following(tester.id).await.unwrap(), 0);

    let profile = fx
        .feed
        .profile("tester", Some(tester.id), None)
        .await
        .unwrap();
    assert!(!profile.following);
}

#[tokio::test]
async fn test_subscription_feed_lists_followed_authors_only() {
    let fx = Fixture::new();
    let reader = fx.user("reader").await;
    let followed = fx.user("followed").await;
    let stranger = fx.user("stranger").await;
    fx.post(&followed, "from followed", None).await;
    fx.post(&stranger, "from stranger", None).await;

    fx.follows.follow(reader.id, "followed").await.unwrap();

    let page = fx.feed.subscriptions(reader.id, None).await.unwrap();
    assert_eq!(page.count, 1);
    assert_eq!(page.items[0].text, "from followed");

    let empty = fx.feed.subscriptions(stranger.id, None).await.unwrap();
    assert_eq!(empty.count, 0);
    assert_eq!(empty.num_pages, 1);
}

#[tokio::test]
async fn test_comments_are_listed_oldest_first() {
    let fx = Fixture::new();
    let author = fx.user("author").await;
    let reader = fx.user("reader").await;
    let post = fx.post(&author, "discuss", None).await;

    for text in ["first", "second"] {
        let outcome = fx
            .comments
            .add(
                reader.id,
                &post,
                &CommentSubmission {
                    text: text.to_string(),
                },
            )
            .await
            .unwrap();
        assert!(outcome.is_saved());
    }

    let blank = fx
        .comments
        .add(reader.id, &post, &CommentSubmission::default())
        .await
        .unwrap();
    assert!(!blank.is_saved());

    let page = fx.feed.post("author", post.id).await.unwrap();
    let texts: Vec<&str> = page.comments.iter().map(|c| c.text.as_str()).collect();
    assert_eq!(texts, ["first", "second"]);
    assert_eq!(page.post.comments_count, 2);
    assert_eq!(page.comments[0].author.username, "reader");
}

#[tokio::test]
async fn test_signup_and_authenticate() {
    let fx = Fixture::new();
    let tester = fx.user("tester").await;

    let duplicate = fx
        .accounts
        .signup(&SignupSubmission {
            username: "tester".to_string(),
            password: "another-pass".to_string(),
        })
        .await
        .unwrap();
    let FormOutcome::Invalid(errors) = duplicate else {
        panic!("expected duplicate username error");
    };
    assert!(errors.has("username"));

    let short = fx
        .accounts
        .signup(&SignupSubmission {
            username: "fresh".to_string(),
            password: "short".to_string(),
        })
        .await
        .unwrap();
    let FormOutcome::Invalid(errors) = short else {
        panic!("expected short password error");
    };
    assert!(errors.has("password"));

    let found = fx
        .accounts
        .authenticate("tester", "s3cret-pass")
        .await
        .unwrap();
    assert_eq!(found.map(|u| u.id), Some(tester.id));
    assert!(
        fx.accounts
            .authenticate("tester", "wrong-pass")
            .await
            .unwrap()
            .is_none()
    );
    assert!(
        fx.accounts
            .authenticate("ghost", "s3cret-pass")
            .await
            .unwrap()
            .is_none()
    );
}

#[tokio::test]
async fn test_deleted_account_is_inactive() {
    let fx = Fixture::new();
    let tester = fx.user("tester").await;

    assert!(fx.accounts.is_active(tester.id).await.unwrap());
    assert!(!fx.accounts.is_active(Uuid::new_v4()).await.unwrap());

    fx.repos.users.delete(tester.id).await.unwrap();
    assert!(!fx.accounts.is_active(tester.id).await.unwrap());
}

#[tokio::test]
async fn test_group_slug_rules() {
    let fx = Fixture::new();
    fx.group("Cats", "cats").await;

    let duplicate = fx
        .groups
        .create(&GroupSubmission {
            title: "More cats".to_string(),
            slug: "cats".to_string(),
            description: String::new(),
        })
        .await
        .unwrap();
    assert!(!duplicate.is_saved());

    let invalid = fx
        .groups
        .create(&GroupSubmission {
            title: "Dogs".to_string(),
            slug: "dogs and more".to_string(),
            description: String::new(),
        })
        .await
        .unwrap();
    let FormOutcome::Invalid(errors) = invalid else {
        panic!("expected slug error");
    };
    assert!(errors.has("slug"));

    let titles: Vec<String> = fx
        .repos
        .groups
        .list()
        .await
        .unwrap()
        .into_iter()
        .map(|g| g.title)
        .collect();
    assert_eq!(titles, ["Cats"]);
}
