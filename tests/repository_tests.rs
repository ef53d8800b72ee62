use blog_portal::{
    models::{NewUser, PostForm, ROLE_ADMIN, ROLE_MEMBER, User},
    repository::{Repository, RepositoryError, SqliteRepository},
};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use std::str::FromStr;

// --- Test utilities ---

/// Fresh in-memory database per test. A single connection keeps the shared
/// memory store alive for the repository's lifetime.
async fn repo() -> SqliteRepository {
    let options = SqliteConnectOptions::from_str("sqlite::memory:")
        .expect("valid sqlite url")
        .foreign_keys(true);
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(options)
        .await
        .expect("Failed to open in-memory SQLite");

    let repo = SqliteRepository::new(pool);
    repo.init_schema().await.expect("schema bootstrap failed");
    repo
}

async fn seed_user(repo: &SqliteRepository, email: &str, role: &str) -> User {
    repo.create_user(NewUser {
        email: email.to_string(),
        name: email.split('@').next().unwrap_or("user").to_string(),
        password_hash: "$argon2id$stub".to_string(),
        role: role.to_string(),
    })
    .await
    .expect("seeding user failed")
}

fn post_form(title: &str) -> PostForm {
    PostForm {
        title: title.to_string(),
        subtitle: "A subtitle".to_string(),
        img_url: "https://img.example/cover.png".to_string(),
        body: "<p>Body text</p>".to_string(),
    }
}

// --- Users ---

#[tokio::test]
async fn test_create_user_rejects_duplicate_email() {
    let repo = repo().await;
    seed_user(&repo, "dup@example.com", ROLE_ADMIN).await;

    let result = repo
        .create_user(NewUser {
            email: "dup@example.com".to_string(),
            name: "Other".to_string(),
            password_hash: "$argon2id$stub".to_string(),
            role: ROLE_MEMBER.to_string(),
        })
        .await;

    assert!(matches!(result, Err(RepositoryError::DuplicateEmail)));
    // The failed insert left no row behind.
    assert_eq!(repo.count_users().await.unwrap(), 1);
}

#[tokio::test]
async fn test_find_user_by_email() {
    let repo = repo().await;
    let created = seed_user(&repo, "reader@example.com", ROLE_MEMBER).await;

    let found = repo
        .find_user_by_email("reader@example.com")
        .await
        .unwrap()
        .expect("user should exist");
    assert_eq!(found.id, created.id);
    assert_eq!(found.role, ROLE_MEMBER);

    assert!(
        repo.find_user_by_email("nobody@example.com")
            .await
            .unwrap()
            .is_none()
    );
}

// --- Posts ---

#[tokio::test]
async fn test_post_round_trip_preserves_fields() {
    let repo = repo().await;
    let admin = seed_user(&repo, "admin@example.com", ROLE_ADMIN).await;

    let created = repo
        .create_post(post_form("First Post"), admin.id, "April 05, 2024")
        .await
        .unwrap();
    assert!(created.id > 0);

    let listed = repo.list_posts().await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].title, "First Post");
    assert_eq!(listed[0].author_name.as_deref(), Some("admin"));

    let fetched = repo.get_post(created.id).await.unwrap().expect("post exists");
    assert_eq!(fetched.subtitle, "A subtitle");
    assert_eq!(fetched.body, "<p>Body text</p>");
    assert_eq!(fetched.date, "April 05, 2024");
    assert_eq!(fetched.user_id, admin.id);
}

#[tokio::test]
async fn test_list_posts_in_insertion_order() {
    let repo = repo().await;
    let admin = seed_user(&repo, "admin@example.com", ROLE_ADMIN).await;

    for title in ["Alpha", "Beta", "Gamma"] {
        repo.create_post(post_form(title), admin.id, "April 05, 2024")
            .await
            .unwrap();
    }

    let titles: Vec<String> = repo
        .list_posts()
        .await
        .unwrap()
        .into_iter()
        .map(|p| p.title)
        .collect();
    assert_eq!(titles, ["Alpha", "Beta", "Gamma"]);
}

#[tokio::test]
async fn test_create_post_rejects_duplicate_title() {
    let repo = repo().await;
    let admin = seed_user(&repo, "admin@example.com", ROLE_ADMIN).await;

    repo.create_post(post_form("Unique Title"), admin.id, "April 05, 2024")
        .await
        .unwrap();
    let result = repo
        .create_post(post_form("Unique Title"), admin.id, "April 06, 2024")
        .await;

    assert!(matches!(result, Err(RepositoryError::DuplicateTitle)));
    assert_eq!(repo.list_posts().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_update_post_rejects_duplicate_title() {
    let repo = repo().await;
    let admin = seed_user(&repo, "admin@example.com", ROLE_ADMIN).await;

    repo.create_post(post_form("Taken"), admin.id, "April 05, 2024")
        .await
        .unwrap();
    let second = repo
        .create_post(post_form("Original"), admin.id, "April 05, 2024")
        .await
        .unwrap();

    let result = repo.update_post(second.id, post_form("Taken")).await;
    assert!(matches!(result, Err(RepositoryError::DuplicateTitle)));
}

#[tokio::test]
async fn test_update_post_leaves_date_and_author_untouched() {
    let repo = repo().await;
    let admin = seed_user(&repo, "admin@example.com", ROLE_ADMIN).await;
    let created = repo
        .create_post(post_form("Before"), admin.id, "April 05, 2024")
        .await
        .unwrap();

    let mut edit = post_form("After");
    edit.subtitle = "New subtitle".to_string();
    let updated = repo
        .update_post(created.id, edit)
        .await
        .unwrap()
        .expect("post exists");

    assert_eq!(updated.title, "After");
    assert_eq!(updated.subtitle, "New subtitle");
    // Stamped at creation, immutable afterwards.
    assert_eq!(updated.date, "April 05, 2024");
    assert_eq!(updated.user_id, admin.id);
}

#[tokio::test]
async fn test_missing_post_is_none_not_an_error() {
    let repo = repo().await;
    assert!(repo.get_post(9999).await.unwrap().is_none());
    assert!(repo.update_post(9999, post_form("X")).await.unwrap().is_none());
    assert!(!repo.delete_post(9999).await.unwrap());
}

// --- Comments ---

#[tokio::test]
async fn test_add_comment_carries_author_join() {
    let repo = repo().await;
    let admin = seed_user(&repo, "admin@example.com", ROLE_ADMIN).await;
    let reader = seed_user(&repo, "reader@example.com", ROLE_MEMBER).await;
    let post = repo
        .create_post(post_form("Commented"), admin.id, "April 05, 2024")
        .await
        .unwrap();

    let before = repo.comments_for_post(post.id).await.unwrap().len();
    let comment = repo
        .add_comment(post.id, reader.id, "Nice post!")
        .await
        .unwrap();

    assert_eq!(comment.post_id, post.id);
    assert_eq!(comment.user_id, reader.id);
    assert_eq!(comment.author_name.as_deref(), Some("reader"));
    assert_eq!(comment.author_email.as_deref(), Some("reader@example.com"));

    let after = repo.comments_for_post(post.id).await.unwrap();
    assert_eq!(after.len(), before + 1);
    assert_eq!(after.last().unwrap().body, "Nice post!");
}

#[tokio::test]
async fn test_delete_post_cascades_comments() {
    let repo = repo().await;
    let admin = seed_user(&repo, "admin@example.com", ROLE_ADMIN).await;
    let reader = seed_user(&repo, "reader@example.com", ROLE_MEMBER).await;
    let post = repo
        .create_post(post_form("Doomed"), admin.id, "April 05, 2024")
        .await
        .unwrap();
    repo.add_comment(post.id, reader.id, "First!").await.unwrap();
    repo.add_comment(post.id, admin.id, "Thanks!").await.unwrap();

    assert!(repo.delete_post(post.id).await.unwrap());

    assert!(repo.get_post(post.id).await.unwrap().is_none());
    // No dangling comment rows survive the post.
    assert!(repo.comments_for_post(post.id).await.unwrap().is_empty());
    // A second delete of the same id affects nothing.
    assert!(!repo.delete_post(post.id).await.unwrap());
}
