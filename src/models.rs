use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

// Role values stored in `users.role`.
pub const ROLE_ADMIN: &str = "admin";
pub const ROLE_MEMBER: &str = "member";

// --- Core Application Schemas (Mapped to Database) ---

/// User
///
/// Represents a registered account from the `users` table. The password is
/// stored only as a salted Argon2id hash and is never serialized into page
/// data.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, Default)]
pub struct User {
    pub id: i64,
    // Unique login identifier.
    pub email: String,
    // Display name shown next to posts and comments.
    pub name: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    // The RBAC field: 'admin' or 'member'. The first registered account
    // becomes the admin.
    pub role: String,
}

impl User {
    pub fn is_admin(&self) -> bool {
        self.role == ROLE_ADMIN
    }
}

/// Post
///
/// Represents a blog post record from the `blog_posts` table. The `date`
/// column holds the human-readable creation date ("April 05, 2024") and is
/// stamped once at creation, never on edit.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, Default)]
pub struct Post {
    pub id: i64,
    // Unique across all posts.
    pub title: String,
    pub subtitle: String,
    pub date: String,
    // Admin-authored rich text, rendered verbatim.
    pub body: String,
    pub img_url: String,
    // FK to users.id (author).
    pub user_id: i64,
    /// Author display name, loaded via a JOIN in the repository query.
    #[sqlx(default)]
    pub author_name: Option<String>,
}

/// Comment
///
/// Represents a comment record from the `comments` table, augmented with the
/// author's name and email (a join operation). The email feeds the avatar
/// URL generator at render time.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, Default)]
pub struct Comment {
    pub id: i64,
    pub body: String,
    pub user_id: i64,
    pub post_id: i64,
    #[sqlx(default)]
    pub author_name: Option<String>,
    #[sqlx(default)]
    pub author_email: Option<String>,
}

/// NewUser
///
/// Insertion payload for a registration that already passed validation and
/// password hashing. The id is assigned by the database.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub name: String,
    pub password_hash: String,
    pub role: String,
}

// --- Request Payloads (Form Schemas) ---

/// RegisterForm
///
/// Input payload for the registration form (POST /register).
#[derive(Debug, Clone, Serialize, Deserialize, Validate, Default)]
pub struct RegisterForm {
    #[validate(email(message = "Email must be a valid address."))]
    pub email: String,
    #[validate(length(min = 1, message = "Name is required."))]
    pub name: String,
    #[validate(length(min = 1, message = "Password is required."))]
    pub password: String,
}

/// LoginForm
///
/// Input payload for the login form (POST /login).
#[derive(Debug, Clone, Serialize, Deserialize, Validate, Default)]
pub struct LoginForm {
    #[validate(email(message = "Email must be a valid address."))]
    pub email: String,
    #[validate(length(min = 1, message = "Password is required."))]
    pub password: String,
}

/// PostForm
///
/// Input payload shared by the new-post and edit-post forms. The author and
/// creation date are never part of the form; they are stamped server-side on
/// creation and left untouched on edit.
#[derive(Debug, Clone, Serialize, Deserialize, Validate, Default)]
pub struct PostForm {
    #[validate(length(min = 1, message = "Title is required."))]
    pub title: String,
    #[validate(length(min = 1, message = "Subtitle is required."))]
    pub subtitle: String,
    #[validate(url(message = "Image URL must be a valid URL."))]
    pub img_url: String,
    #[validate(length(min = 1, message = "Body is required."))]
    pub body: String,
}

/// CommentForm
///
/// Input payload for submitting a comment on a post page.
#[derive(Debug, Clone, Serialize, Deserialize, Validate, Default)]
pub struct CommentForm {
    #[validate(length(min = 1, message = "Comment is required."))]
    pub body: String,
}
