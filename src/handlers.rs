use axum::{
    Form,
    extract::{Path, State},
    http::StatusCode,
    response::{Html, IntoResponse, Redirect, Response},
};
use axum_extra::extract::cookie::CookieJar;
use chrono::Utc;
use serde_json::{Value, json};
use validator::{Validate, ValidationErrors};

use crate::{
    AppState,
    auth::{self, CurrentUser},
    flash::{set_flash, take_flash},
    models::{CommentForm, LoginForm, NewUser, Post, PostForm, RegisterForm, ROLE_ADMIN, ROLE_MEMBER},
    repository::RepositoryError,
};

// User-facing notices. The login failure text is deliberately generic so a
// failed attempt reveals nothing about which field was wrong.
pub const DUPLICATE_EMAIL_FLASH: &str = "That email already exists. Please log in instead.";
pub const LOGIN_BEFORE_COMMENTING_FLASH: &str = "Please login before commenting";
pub const INVALID_CREDENTIALS_MESSAGE: &str =
    "Invalid credentials. Please double check your email and password.";
pub const DUPLICATE_TITLE_MESSAGE: &str = "A post with that title already exists.";

// --- Shared helpers ---

/// Logs an unexpected failure and maps it to a 500. Recoverable conditions
/// never take this path.
fn internal<E: std::fmt::Display>(e: E) -> StatusCode {
    tracing::error!("internal error: {e}");
    StatusCode::INTERNAL_SERVER_ERROR
}

/// The viewer entry every template receives: null for anonymous requests.
fn viewer_json(user: &CurrentUser) -> Value {
    match &user.0 {
        Some(user) => json!({ "name": user.name, "is_admin": user.is_admin() }),
        None => Value::Null,
    }
}

/// Flattens validator output into sorted display strings. Sorted because the
/// underlying field map has no stable order.
fn validation_messages(errors: &ValidationErrors) -> Vec<String> {
    let mut messages: Vec<String> = errors
        .field_errors()
        .into_iter()
        .flat_map(|(_, field_errors)| field_errors.iter())
        .filter_map(|e| e.message.as_ref().map(|m| m.to_string()))
        .collect();
    messages.sort();
    messages
}

fn render_page(state: &AppState, template: &str, data: Value) -> Result<Html<String>, StatusCode> {
    state
        .renderer
        .render(template, &data)
        .map(Html)
        .map_err(internal)
}

/// Renders the shared 404 page with a 404 status.
fn not_found_page(
    state: &AppState,
    user: &CurrentUser,
    jar: CookieJar,
) -> Result<Response, StatusCode> {
    let (jar, flash) = take_flash(jar);
    let page = render_page(
        state,
        "not-found",
        json!({ "viewer": viewer_json(user), "flash": flash }),
    )?;
    Ok((StatusCode::NOT_FOUND, jar, page).into_response())
}

/// Renders the post page with its full comment list; `errors` carries any
/// comment-form validation messages.
async fn render_post_page(
    state: &AppState,
    user: &CurrentUser,
    jar: CookieJar,
    post: Post,
    errors: Vec<String>,
) -> Result<Response, StatusCode> {
    let comments = state
        .repo
        .comments_for_post(post.id)
        .await
        .map_err(internal)?;
    let (jar, flash) = take_flash(jar);
    let page = render_page(
        state,
        "post",
        json!({
            "post": post,
            "comments": comments,
            "viewer": viewer_json(user),
            "flash": flash,
            "errors": errors,
        }),
    )?;
    Ok((jar, page).into_response())
}

// --- Public pages ---

/// list_posts
///
/// [Public Route] Renders the home listing with every post in insertion
/// order.
pub async fn list_posts(
    State(state): State<AppState>,
    user: CurrentUser,
    jar: CookieJar,
) -> Result<Response, StatusCode> {
    let posts = state.repo.list_posts().await.map_err(internal)?;
    let (jar, flash) = take_flash(jar);
    let page = render_page(
        &state,
        "index",
        json!({ "posts": posts, "viewer": viewer_json(&user), "flash": flash }),
    )?;
    Ok((jar, page).into_response())
}

/// show_post
///
/// [Public Route] Renders a single post with its comments and the comment
/// form. A missing id yields the 404 page, never a blank render.
pub async fn show_post(
    State(state): State<AppState>,
    user: CurrentUser,
    jar: CookieJar,
    Path(id): Path<i64>,
) -> Result<Response, StatusCode> {
    match state.repo.get_post(id).await.map_err(internal)? {
        Some(post) => render_post_page(&state, &user, jar, post, Vec::new()).await,
        None => not_found_page(&state, &user, jar),
    }
}

/// about
///
/// [Public Route] Static informational page.
pub async fn about(
    State(state): State<AppState>,
    user: CurrentUser,
    jar: CookieJar,
) -> Result<Response, StatusCode> {
    let (jar, flash) = take_flash(jar);
    let page = render_page(
        &state,
        "about",
        json!({ "viewer": viewer_json(&user), "flash": flash }),
    )?;
    Ok((jar, page).into_response())
}

/// contact
///
/// [Public Route] Static informational page.
pub async fn contact(
    State(state): State<AppState>,
    user: CurrentUser,
    jar: CookieJar,
) -> Result<Response, StatusCode> {
    let (jar, flash) = take_flash(jar);
    let page = render_page(
        &state,
        "contact",
        json!({ "viewer": viewer_json(&user), "flash": flash }),
    )?;
    Ok((jar, page).into_response())
}

// --- Registration & login ---

/// register_form
///
/// [Public Route] Renders the registration form. Already-authenticated
/// visitors are bounced straight home.
pub async fn register_form(
    State(state): State<AppState>,
    user: CurrentUser,
    jar: CookieJar,
) -> Result<Response, StatusCode> {
    if user.0.is_some() {
        return Ok(Redirect::to("/").into_response());
    }
    let (jar, flash) = take_flash(jar);
    let page = render_page(
        &state,
        "register",
        json!({ "viewer": Value::Null, "flash": flash, "errors": [], "name": "", "email": "" }),
    )?;
    Ok((jar, page).into_response())
}

/// register
///
/// [Public Route] Creates an account. A duplicate email never creates a row;
/// it flashes a notice and redirects to the login page instead. The first
/// account ever registered becomes the admin. On success the new user is
/// logged in immediately.
pub async fn register(
    State(state): State<AppState>,
    user: CurrentUser,
    jar: CookieJar,
    Form(form): Form<RegisterForm>,
) -> Result<Response, StatusCode> {
    if user.0.is_some() {
        return Ok(Redirect::to("/").into_response());
    }

    if let Err(errors) = form.validate() {
        let (jar, flash) = take_flash(jar);
        let page = render_page(
            &state,
            "register",
            json!({
                "viewer": Value::Null,
                "flash": flash,
                "errors": validation_messages(&errors),
                "name": form.name,
                "email": form.email,
            }),
        )?;
        return Ok((jar, page).into_response());
    }

    if state
        .repo
        .find_user_by_email(&form.email)
        .await
        .map_err(internal)?
        .is_some()
    {
        let jar = set_flash(jar, DUPLICATE_EMAIL_FLASH);
        return Ok((jar, Redirect::to("/login")).into_response());
    }

    let role = if state.repo.count_users().await.map_err(internal)? == 0 {
        ROLE_ADMIN
    } else {
        ROLE_MEMBER
    };
    let password_hash = auth::hash_password(&form.password).map_err(internal)?;

    match state
        .repo
        .create_user(NewUser {
            email: form.email,
            name: form.name,
            password_hash,
            role: role.to_string(),
        })
        .await
    {
        Ok(created) => {
            let jar = auth::start_session(jar, created.id, &state.config).map_err(internal)?;
            Ok((jar, Redirect::to("/")).into_response())
        }
        // Lost a race with a concurrent registration for the same email; the
        // unique constraint is the arbiter.
        Err(RepositoryError::DuplicateEmail) => {
            let jar = set_flash(jar, DUPLICATE_EMAIL_FLASH);
            Ok((jar, Redirect::to("/login")).into_response())
        }
        Err(e) => Err(internal(e)),
    }
}

/// login_form
///
/// [Public Route] Renders the login form, redirecting authenticated
/// visitors home.
pub async fn login_form(
    State(state): State<AppState>,
    user: CurrentUser,
    jar: CookieJar,
) -> Result<Response, StatusCode> {
    if user.0.is_some() {
        return Ok(Redirect::to("/").into_response());
    }
    let (jar, flash) = take_flash(jar);
    let page = render_page(
        &state,
        "login",
        json!({ "viewer": Value::Null, "flash": flash, "errors": [], "email": "" }),
    )?;
    Ok((jar, page).into_response())
}

/// login
///
/// [Public Route] Verifies credentials and establishes a session. Unknown
/// email and wrong password take the same path: the form is re-rendered with
/// one generic message and no redirect.
pub async fn login(
    State(state): State<AppState>,
    user: CurrentUser,
    jar: CookieJar,
    Form(form): Form<LoginForm>,
) -> Result<Response, StatusCode> {
    if user.0.is_some() {
        return Ok(Redirect::to("/").into_response());
    }

    if let Err(errors) = form.validate() {
        let (jar, flash) = take_flash(jar);
        let page = render_page(
            &state,
            "login",
            json!({
                "viewer": Value::Null,
                "flash": flash,
                "errors": validation_messages(&errors),
                "email": form.email,
            }),
        )?;
        return Ok((jar, page).into_response());
    }

    if let Some(account) = state
        .repo
        .find_user_by_email(&form.email)
        .await
        .map_err(internal)?
    {
        if auth::verify_password(&form.password, &account.password_hash) {
            let jar = auth::start_session(jar, account.id, &state.config).map_err(internal)?;
            return Ok((jar, Redirect::to("/")).into_response());
        }
    }

    let (jar, flash) = take_flash(jar);
    let page = render_page(
        &state,
        "login",
        json!({
            "viewer": Value::Null,
            "flash": flash,
            "errors": [INVALID_CREDENTIALS_MESSAGE],
            "email": form.email,
        }),
    )?;
    Ok((jar, page).into_response())
}

/// logout
///
/// [Public Route] Clears the session unconditionally and redirects home.
/// Calling it while anonymous is a no-op with the same redirect.
pub async fn logout(jar: CookieJar) -> Response {
    let jar = auth::end_session(jar);
    (jar, Redirect::to("/")).into_response()
}

// --- Commenting ---

/// add_comment
///
/// [Authenticated Route] Persists a comment by the viewer on the given post
/// and re-renders the post page with the full comment list. The login guard
/// on the route layer redirects anonymous submissions to the login page with
/// a flash, before any persistence work.
pub async fn add_comment(
    State(state): State<AppState>,
    user: CurrentUser,
    jar: CookieJar,
    Path(id): Path<i64>,
    Form(form): Form<CommentForm>,
) -> Result<Response, StatusCode> {
    let Some(viewer) = user.0.clone() else {
        let jar = set_flash(jar, LOGIN_BEFORE_COMMENTING_FLASH);
        return Ok((jar, Redirect::to("/login")).into_response());
    };

    let Some(post) = state.repo.get_post(id).await.map_err(internal)? else {
        return not_found_page(&state, &user, jar);
    };

    if let Err(errors) = form.validate() {
        return render_post_page(&state, &user, jar, post, validation_messages(&errors)).await;
    }

    state
        .repo
        .add_comment(post.id, viewer.id, &form.body)
        .await
        .map_err(internal)?;

    render_post_page(&state, &user, jar, post, Vec::new()).await
}

// --- Post administration ---

fn post_form_data(
    user: &CurrentUser,
    flash: Option<String>,
    heading: &str,
    action: &str,
    form: &PostForm,
    errors: Vec<String>,
) -> Value {
    json!({
        "viewer": viewer_json(user),
        "flash": flash,
        "heading": heading,
        "action": action,
        "form": form,
        "errors": errors,
    })
}

/// new_post_form
///
/// [Admin Route] Renders the empty post form.
pub async fn new_post_form(
    State(state): State<AppState>,
    user: CurrentUser,
    jar: CookieJar,
) -> Result<Response, StatusCode> {
    let (jar, flash) = take_flash(jar);
    let page = render_page(
        &state,
        "make-post",
        post_form_data(&user, flash, "New Post", "/new-post", &PostForm::default(), Vec::new()),
    )?;
    Ok((jar, page).into_response())
}

/// create_post
///
/// [Admin Route] Validates and persists a new post, stamped with today's
/// date and the admin as author, then redirects to the listing. A duplicate
/// title re-renders the form with a message and persists nothing.
pub async fn create_post(
    State(state): State<AppState>,
    user: CurrentUser,
    jar: CookieJar,
    Form(form): Form<PostForm>,
) -> Result<Response, StatusCode> {
    let Some(author) = user.0.as_ref() else {
        return Err(StatusCode::FORBIDDEN);
    };

    if let Err(errors) = form.validate() {
        let (jar, flash) = take_flash(jar);
        let page = render_page(
            &state,
            "make-post",
            post_form_data(&user, flash, "New Post", "/new-post", &form, validation_messages(&errors)),
        )?;
        return Ok((jar, page).into_response());
    }

    let date = Utc::now().format("%B %d, %Y").to_string();
    match state.repo.create_post(form.clone(), author.id, &date).await {
        Ok(_) => Ok(Redirect::to("/").into_response()),
        Err(RepositoryError::DuplicateTitle) => {
            let (jar, flash) = take_flash(jar);
            let page = render_page(
                &state,
                "make-post",
                post_form_data(
                    &user,
                    flash,
                    "New Post",
                    "/new-post",
                    &form,
                    vec![DUPLICATE_TITLE_MESSAGE.to_string()],
                ),
            )?;
            Ok((jar, page).into_response())
        }
        Err(e) => Err(internal(e)),
    }
}

/// edit_post_form
///
/// [Admin Route] Renders the post form pre-filled with the existing fields.
pub async fn edit_post_form(
    State(state): State<AppState>,
    user: CurrentUser,
    jar: CookieJar,
    Path(id): Path<i64>,
) -> Result<Response, StatusCode> {
    let Some(post) = state.repo.get_post(id).await.map_err(internal)? else {
        return not_found_page(&state, &user, jar);
    };

    let form = PostForm {
        title: post.title,
        subtitle: post.subtitle,
        img_url: post.img_url,
        body: post.body,
    };
    let action = format!("/edit-post/{id}");
    let (jar, flash) = take_flash(jar);
    let page = render_page(
        &state,
        "make-post",
        post_form_data(&user, flash, "Edit Post", &action, &form, Vec::new()),
    )?;
    Ok((jar, page).into_response())
}

/// update_post
///
/// [Admin Route] Overwrites title, subtitle, image URL, and body of an
/// existing post. Author and creation date are never touched. Redirects to
/// the post's view page on success.
pub async fn update_post(
    State(state): State<AppState>,
    user: CurrentUser,
    jar: CookieJar,
    Path(id): Path<i64>,
    Form(form): Form<PostForm>,
) -> Result<Response, StatusCode> {
    let action = format!("/edit-post/{id}");

    if let Err(errors) = form.validate() {
        let (jar, flash) = take_flash(jar);
        let page = render_page(
            &state,
            "make-post",
            post_form_data(&user, flash, "Edit Post", &action, &form, validation_messages(&errors)),
        )?;
        return Ok((jar, page).into_response());
    }

    match state.repo.update_post(id, form.clone()).await {
        Ok(Some(post)) => Ok(Redirect::to(&format!("/post/{}", post.id)).into_response()),
        Ok(None) => not_found_page(&state, &user, jar),
        Err(RepositoryError::DuplicateTitle) => {
            let (jar, flash) = take_flash(jar);
            let page = render_page(
                &state,
                "make-post",
                post_form_data(
                    &user,
                    flash,
                    "Edit Post",
                    &action,
                    &form,
                    vec![DUPLICATE_TITLE_MESSAGE.to_string()],
                ),
            )?;
            Ok((jar, page).into_response())
        }
        Err(e) => Err(internal(e)),
    }
}

/// delete_post
///
/// [Admin Route] Deletes a post by id; its comments go with it. A missing
/// id yields the 404 page, a deleted post a redirect to the listing.
pub async fn delete_post(
    State(state): State<AppState>,
    user: CurrentUser,
    jar: CookieJar,
    Path(id): Path<i64>,
) -> Result<Response, StatusCode> {
    if state.repo.delete_post(id).await.map_err(internal)? {
        Ok(Redirect::to("/").into_response())
    } else {
        not_found_page(&state, &user, jar)
    }
}
