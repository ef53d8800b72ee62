use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};

/// Name of the one-shot notice cookie. A message set during one request is
/// rendered by the next page and cleared in the same response.
pub const FLASH_COOKIE: &str = "flash";

fn flash_cookie(value: String) -> Cookie<'static> {
    Cookie::build((FLASH_COOKIE, value))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .build()
}

/// Stores a flash message for the next rendered page. The message is
/// percent-encoded so arbitrary text survives the cookie value grammar.
pub fn set_flash(jar: CookieJar, message: &str) -> CookieJar {
    jar.add(flash_cookie(urlencoding::encode(message).into_owned()))
}

/// Takes the pending flash message, if any, clearing it from the jar so it is
/// shown exactly once.
pub fn take_flash(jar: CookieJar) -> (CookieJar, Option<String>) {
    let message = jar.get(FLASH_COOKIE).map(|cookie| {
        urlencoding::decode(cookie.value())
            .map(|decoded| decoded.into_owned())
            .unwrap_or_else(|_| cookie.value().to_string())
    });

    match message {
        Some(message) => (jar.remove(flash_cookie(String::new())), Some(message)),
        None => (jar, None),
    }
}
