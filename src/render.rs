use serde_json::Value;
use std::sync::Arc;

#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("unknown template: {0}")]
    UnknownTemplate(String),
}

/// Renderer
///
/// Defines the narrow contract with the presentation layer: a template name
/// plus a data mapping in, an HTML page out. Handlers never build markup
/// themselves, which keeps the page structure swappable without touching any
/// route logic.
pub trait Renderer: Send + Sync {
    fn render(&self, template: &str, data: &Value) -> Result<String, RenderError>;
}

/// RendererState
///
/// The concrete type used to share the renderer across the application state.
pub type RendererState = Arc<dyn Renderer>;

/// Escapes text for safe interpolation into HTML. Post bodies are the one
/// exception; they are admin-authored rich text and rendered verbatim.
pub fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Builds a stable avatar image URL from a commenter's email address.
pub fn avatar_url(email: &str) -> String {
    format!(
        "https://api.dicebear.com/7.x/identicon/svg?seed={}",
        urlencoding::encode(email)
    )
}

// --- Data mapping accessors ---

fn text<'a>(data: &'a Value, key: &str) -> &'a str {
    data.get(key).and_then(Value::as_str).unwrap_or("")
}

fn items<'a>(data: &'a Value, key: &str) -> &'a [Value] {
    data.get(key).and_then(Value::as_array).map_or(&[], Vec::as_slice)
}

/// HtmlRenderer
///
/// The built-in `Renderer` implementation. Produces small server-rendered
/// pages sharing one layout: a navigation bar reflecting the viewer's login
/// state, a one-shot flash notice slot, and the page body.
pub struct HtmlRenderer;

impl Renderer for HtmlRenderer {
    fn render(&self, template: &str, data: &Value) -> Result<String, RenderError> {
        match template {
            "index" => Ok(self.index(data)),
            "post" => Ok(self.post(data)),
            "register" => Ok(self.register(data)),
            "login" => Ok(self.login(data)),
            "make-post" => Ok(self.make_post(data)),
            "about" => Ok(self.static_page(data, "About", ABOUT_TEXT)),
            "contact" => Ok(self.static_page(data, "Contact", CONTACT_TEXT)),
            "not-found" => Ok(self.not_found(data)),
            other => Err(RenderError::UnknownTemplate(other.to_string())),
        }
    }
}

const ABOUT_TEXT: &str = "A small blog about whatever is currently interesting.";
const CONTACT_TEXT: &str = "Reach the author by carrier pigeon, or leave a comment on any post.";

impl HtmlRenderer {
    /// Shared page chrome. `viewer` is either null (anonymous) or an object
    /// with `name` and `is_admin`.
    fn layout(&self, data: &Value, title: &str, body: &str) -> String {
        let viewer = data.get("viewer").filter(|v| !v.is_null());

        let mut nav = String::from(
            r#"<nav><a href="/">Home</a> <a href="/about">About</a> <a href="/contact">Contact</a>"#,
        );
        match viewer {
            Some(viewer) => {
                if viewer.get("is_admin").and_then(Value::as_bool).unwrap_or(false) {
                    nav.push_str(r#" <a href="/new-post">New Post</a>"#);
                }
                nav.push_str(&format!(
                    r#" <span class="viewer">{}</span> <a href="/logout">Log Out</a>"#,
                    escape_html(text(viewer, "name")),
                ));
            }
            None => {
                nav.push_str(r#" <a href="/login">Log In</a> <a href="/register">Register</a>"#);
            }
        }
        nav.push_str("</nav>");

        let flash = match data.get("flash").and_then(Value::as_str) {
            Some(message) => format!(r#"<p class="flash">{}</p>"#, escape_html(message)),
            None => String::new(),
        };

        format!(
            "<!DOCTYPE html>\n<html lang=\"en\">\n<head><meta charset=\"utf-8\"><title>{}</title></head>\n<body>\n{}\n{}\n<main>\n{}\n</main>\n</body>\n</html>\n",
            escape_html(title),
            nav,
            flash,
            body
        )
    }

    /// Renders validation messages above a form. Empty list, empty markup.
    fn error_list(&self, data: &Value) -> String {
        let errors = items(data, "errors");
        if errors.is_empty() {
            return String::new();
        }
        let mut out = String::from(r#"<ul class="errors">"#);
        for error in errors {
            out.push_str(&format!(
                "<li>{}</li>",
                escape_html(error.as_str().unwrap_or(""))
            ));
        }
        out.push_str("</ul>");
        out
    }

    fn index(&self, data: &Value) -> String {
        let is_admin = data
            .get("viewer")
            .and_then(|v| v.get("is_admin"))
            .and_then(Value::as_bool)
            .unwrap_or(false);

        let mut body = String::from("<h1>The Blog</h1>\n");
        for post in items(data, "posts") {
            let id = post.get("id").and_then(Value::as_i64).unwrap_or(0);
            body.push_str(&format!(
                "<article class=\"post-preview\">\n<h2><a href=\"/post/{id}\">{}</a></h2>\n<h3>{}</h3>\n<p class=\"meta\">Posted by {} on {}</p>\n",
                escape_html(text(post, "title")),
                escape_html(text(post, "subtitle")),
                escape_html(text(post, "author_name")),
                escape_html(text(post, "date")),
            ));
            if is_admin {
                body.push_str(&format!(
                    "<p><a href=\"/edit-post/{id}\">Edit</a> <a href=\"/delete/{id}\">Delete</a></p>\n"
                ));
            }
            body.push_str("</article>\n");
        }
        self.layout(data, "The Blog", &body)
    }

    fn post(&self, data: &Value) -> String {
        let post = data.get("post").cloned().unwrap_or(Value::Null);
        let id = post.get("id").and_then(Value::as_i64).unwrap_or(0);
        let title = text(&post, "title").to_string();

        let mut body = format!(
            "<article class=\"post\">\n<img src=\"{}\" alt=\"\">\n<h1>{}</h1>\n<h2>{}</h2>\n<p class=\"meta\">Posted by {} on {}</p>\n<div class=\"body\">{}</div>\n</article>\n",
            escape_html(text(&post, "img_url")),
            escape_html(&title),
            escape_html(text(&post, "subtitle")),
            escape_html(text(&post, "author_name")),
            escape_html(text(&post, "date")),
            // Rich text straight from the admin's editor.
            text(&post, "body"),
        );

        body.push_str("<section class=\"comments\">\n<h3>Comments</h3>\n");
        for comment in items(data, "comments") {
            let email = text(comment, "author_email");
            body.push_str(&format!(
                "<div class=\"comment\">\n<img class=\"avatar\" src=\"{}\" alt=\"\">\n<p>{}</p>\n<p class=\"meta\">{}</p>\n</div>\n",
                escape_html(&avatar_url(email)),
                escape_html(text(comment, "body")),
                escape_html(text(comment, "author_name")),
            ));
        }

        body.push_str(&self.error_list(data));
        body.push_str(&format!(
            "<form method=\"post\" action=\"/post/{id}\">\n<textarea name=\"body\"></textarea>\n<button type=\"submit\">Comment</button>\n</form>\n</section>\n"
        ));

        self.layout(data, &title, &body)
    }

    fn register(&self, data: &Value) -> String {
        let body = format!(
            "<h1>Register</h1>\n{}<form method=\"post\" action=\"/register\">\n<label>Name <input type=\"text\" name=\"name\" value=\"{}\"></label>\n<label>Email <input type=\"text\" name=\"email\" value=\"{}\"></label>\n<label>Password <input type=\"password\" name=\"password\"></label>\n<button type=\"submit\">Sign Up</button>\n</form>\n",
            self.error_list(data),
            escape_html(text(data, "name")),
            escape_html(text(data, "email")),
        );
        self.layout(data, "Register", &body)
    }

    fn login(&self, data: &Value) -> String {
        let body = format!(
            "<h1>Log In</h1>\n{}<form method=\"post\" action=\"/login\">\n<label>Email <input type=\"text\" name=\"email\" value=\"{}\"></label>\n<label>Password <input type=\"password\" name=\"password\"></label>\n<button type=\"submit\">Login</button>\n</form>\n",
            self.error_list(data),
            escape_html(text(data, "email")),
        );
        self.layout(data, "Log In", &body)
    }

    /// Shared by the new-post and edit-post pages; `action` points the form
    /// back at the right endpoint and `form` carries the current values.
    fn make_post(&self, data: &Value) -> String {
        let form = data.get("form").cloned().unwrap_or(Value::Null);
        let heading = text(data, "heading");
        let body = format!(
            "<h1>{}</h1>\n{}<form method=\"post\" action=\"{}\">\n<label>Blog Post Title <input type=\"text\" name=\"title\" value=\"{}\"></label>\n<label>Subtitle <input type=\"text\" name=\"subtitle\" value=\"{}\"></label>\n<label>Blog Image URL <input type=\"text\" name=\"img_url\" value=\"{}\"></label>\n<label>Blog Content <textarea name=\"body\">{}</textarea></label>\n<button type=\"submit\">Submit</button>\n</form>\n",
            escape_html(heading),
            self.error_list(data),
            escape_html(text(data, "action")),
            escape_html(text(&form, "title")),
            escape_html(text(&form, "subtitle")),
            escape_html(text(&form, "img_url")),
            escape_html(text(&form, "body")),
        );
        self.layout(data, heading, &body)
    }

    fn static_page(&self, data: &Value, title: &str, content: &str) -> String {
        let body = format!("<h1>{}</h1>\n<p>{}</p>\n", title, content);
        self.layout(data, title, &body)
    }

    fn not_found(&self, data: &Value) -> String {
        let body = "<h1>Not Found</h1>\n<p>That page does not exist. <a href=\"/\">Back to the blog.</a></p>\n";
        self.layout(data, "Not Found", body)
    }
}
