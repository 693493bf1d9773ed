use crate::{
    AppState,
    auth::{self, AdminUser, AuthUser, Denied, MaybeUser, PostOwner},
    errors::{BlogError, BlogResult},
    flash,
    mailer::OutgoingMail,
    models::{CommentForm, ContactForm, LoginForm, PostForm, RegisterForm, Role},
    password,
    views::{
        AboutTemplate, ContactTemplate, HtmlTemplate, IndexTemplate, LoginTemplate, PageContext,
        PostFormTemplate, PostTemplate, RegisterTemplate,
    },
};
use axum::{
    Form,
    extract::{Path, State},
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::cookie::CookieJar;
use uuid::Uuid;
use validator::Validate;

// --- Guest Handlers ---

/// register_page
///
/// [Guest Route] Shows the registration form.
#[utoipa::path(
    get,
    path = "/register",
    responses(
        (status = 200, description = "Registration form", body = String, content_type = "text/html"),
        (status = 303, description = "Already logged in")
    )
)]
pub async fn register_page(jar: CookieJar) -> Response {
    let (jar, flash) = flash::take(jar);
    let view = RegisterTemplate {
        page: PageContext::new(None, flash),
        name: String::new(),
        email: String::new(),
    };
    (jar, HtmlTemplate(view)).into_response()
}

/// register
///
/// [Guest Route] Creates an account. The address configured as `ADMIN_EMAIL`
/// receives the admin role, everyone else is a reader.
#[utoipa::path(
    post,
    path = "/register",
    request_body(content = RegisterForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 200, description = "Form re-rendered with a flash message", body = String, content_type = "text/html"),
        (status = 303, description = "Registered, redirect to /login")
    )
)]
pub async fn register(
    State(state): State<AppState>,
    jar: CookieJar,
    Form(form): Form<RegisterForm>,
) -> BlogResult<Response> {
    let rerender = |message: String| {
        let view = RegisterTemplate {
            page: PageContext::new(None, Some(message)),
            name: form.name.clone(),
            email: form.email.clone(),
        };
        HtmlTemplate(view).into_response()
    };

    if let Err(errors) = form.validate() {
        return Ok(rerender(BlogError::from(errors).to_string()));
    }

    let role = if state.config.is_admin_email(&form.email) {
        Role::Admin
    } else {
        Role::Reader
    };

    match state.repo.register_user(&form, role).await {
        Ok(_) => Ok(flash::redirect(jar, "Account created, please log in.", "/login")),
        Err(e) => {
            let message = e.into_flash()?;
            Ok(rerender(format!(
                "There was an issue registering your account: {message}"
            )))
        }
    }
}

/// login_page
///
/// [Guest Route] Shows the login form.
#[utoipa::path(
    get,
    path = "/login",
    responses(
        (status = 200, description = "Login form", body = String, content_type = "text/html"),
        (status = 303, description = "Already logged in")
    )
)]
pub async fn login_page(jar: CookieJar) -> Response {
    let (jar, flash) = flash::take(jar);
    let view = LoginTemplate {
        page: PageContext::new(None, flash),
        email: String::new(),
    };
    (jar, HtmlTemplate(view)).into_response()
}

/// login
///
/// [Guest Route] Verifies the credentials and sets the session cookie.
#[utoipa::path(
    post,
    path = "/login",
    request_body(content = LoginForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 200, description = "Form re-rendered with a flash message", body = String, content_type = "text/html"),
        (status = 303, description = "Logged in, redirect to /")
    )
)]
pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    Form(form): Form<LoginForm>,
) -> BlogResult<Response> {
    let rerender = |message: &str| {
        let view = LoginTemplate {
            page: PageContext::new(None, Some(message.to_string())),
            email: form.email.clone(),
        };
        HtmlTemplate(view).into_response()
    };

    if let Err(errors) = form.validate() {
        return Ok(rerender(&BlogError::from(errors).to_string()));
    }

    let Some(user) = state.repo.get_user_by_email(&form.email).await? else {
        return Ok(rerender(
            "That email does not exist, please try again or register.",
        ));
    };

    if !password::verify_password(&form.password, &user.password)? {
        tracing::info!(user_id = %user.id, "login rejected: wrong password");
        return Ok(rerender("Password incorrect, please try again."));
    }

    let token = auth::issue_session(user.id, &state.config)?;
    let jar = jar.add(auth::session_cookie(token, &state.config));
    tracing::info!(user_id = %user.id, "user logged in");
    Ok((jar, Redirect::to("/")).into_response())
}

// --- Authenticated Handlers ---

/// logout
///
/// [Authenticated Route] Drops the session cookie.
#[utoipa::path(
    get,
    path = "/logout",
    responses((status = 303, description = "Logged out, redirect to /"))
)]
pub async fn logout(AuthUser { id, .. }: AuthUser, jar: CookieJar) -> Response {
    tracing::info!(user_id = %id, "user logged out");
    (jar.remove(auth::clear_session()), Redirect::to("/")).into_response()
}

/// edit_post_page
///
/// [Owner Route] Shows the post form pre-filled with the current values.
#[utoipa::path(
    get,
    path = "/edit-post/{post_id}",
    params(("post_id" = Uuid, Path, description = "Post ID")),
    responses(
        (status = 200, description = "Edit form", body = String, content_type = "text/html"),
        (status = 303, description = "Not the owner, or no such post")
    )
)]
pub async fn edit_post_page(PostOwner { user, post }: PostOwner, jar: CookieJar) -> Response {
    let (jar, flash) = flash::take(jar);
    let view = PostFormTemplate {
        page: PageContext::new(Some(user), flash),
        form: PostForm::from(&post),
        is_edit: true,
        action: format!("/edit-post/{}", post.id),
    };
    (jar, HtmlTemplate(view)).into_response()
}

/// edit_post
///
/// [Owner Route] Overwrites title, subtitle, image URL and body.
#[utoipa::path(
    post,
    path = "/edit-post/{post_id}",
    params(("post_id" = Uuid, Path, description = "Post ID")),
    request_body(content = PostForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 200, description = "Form re-rendered with a flash message", body = String, content_type = "text/html"),
        (status = 303, description = "Updated, redirect to the post")
    )
)]
pub async fn edit_post(
    PostOwner { user, post }: PostOwner,
    State(state): State<AppState>,
    Form(form): Form<PostForm>,
) -> BlogResult<Response> {
    let action = format!("/edit-post/{}", post.id);

    let failure = match form.validate() {
        Err(errors) => BlogError::from(errors),
        Ok(()) => match state.repo.change_post(post.id, &form).await {
            Ok(updated) => return Ok(Redirect::to(&format!("/post/{}", updated.id)).into_response()),
            Err(e) => e,
        },
    };

    let message = failure.into_flash()?;
    let view = PostFormTemplate {
        page: PageContext::new(
            Some(user),
            Some(format!("There was an issue editing your post: {message}")),
        ),
        form,
        is_edit: true,
        action,
    };
    Ok(HtmlTemplate(view).into_response())
}

/// delete_post
///
/// [Owner Route] Deletes the post together with its comments.
#[utoipa::path(
    get,
    path = "/delete/{post_id}",
    params(("post_id" = Uuid, Path, description = "Post ID")),
    responses((status = 303, description = "Redirect to / with a flash message"))
)]
pub async fn delete_post(
    PostOwner { post, .. }: PostOwner,
    State(state): State<AppState>,
    jar: CookieJar,
) -> BlogResult<Response> {
    match state.repo.remove_post(post.id).await {
        Ok(()) => Ok(flash::redirect(jar, "Post deleted.", "/")),
        Err(e) => {
            let message = e.into_flash()?;
            Ok(flash::redirect(
                jar,
                format!("There was an issue deleting your post: {message}"),
                "/",
            ))
        }
    }
}

// --- Admin Handlers ---

/// new_post_page
///
/// [Admin Route] Shows an empty post form.
#[utoipa::path(
    get,
    path = "/new-post",
    responses(
        (status = 200, description = "New post form", body = String, content_type = "text/html"),
        (status = 303, description = "Not an admin")
    )
)]
pub async fn new_post_page(AdminUser(user): AdminUser, jar: CookieJar) -> Response {
    let (jar, flash) = flash::take(jar);
    let view = PostFormTemplate {
        page: PageContext::new(Some(user), flash),
        form: PostForm::default(),
        is_edit: false,
        action: "/new-post".to_string(),
    };
    (jar, HtmlTemplate(view)).into_response()
}

/// new_post
///
/// [Admin Route] Publishes a post authored by the admin.
#[utoipa::path(
    post,
    path = "/new-post",
    request_body(content = PostForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 200, description = "Form re-rendered with a flash message", body = String, content_type = "text/html"),
        (status = 303, description = "Created, redirect to /")
    )
)]
pub async fn new_post(
    AdminUser(user): AdminUser,
    State(state): State<AppState>,
    Form(form): Form<PostForm>,
) -> BlogResult<Response> {
    let failure = match form.validate() {
        Err(errors) => BlogError::from(errors),
        Ok(()) => match state.repo.add_post(&form, user.id).await {
            Ok(_) => return Ok(Redirect::to("/").into_response()),
            Err(e) => e,
        },
    };

    let message = failure.into_flash()?;
    let view = PostFormTemplate {
        page: PageContext::new(
            Some(user),
            Some(format!("There was an issue adding your post: {message}")),
        ),
        form,
        is_edit: false,
        action: "/new-post".to_string(),
    };
    Ok(HtmlTemplate(view).into_response())
}

// --- Public Handlers ---

/// get_all_posts
///
/// [Public Route] The post listing.
#[utoipa::path(
    get,
    path = "/",
    responses((status = 200, description = "All posts", body = String, content_type = "text/html"))
)]
pub async fn get_all_posts(
    MaybeUser(user): MaybeUser,
    State(state): State<AppState>,
    jar: CookieJar,
) -> BlogResult<Response> {
    let (jar, flash) = flash::take(jar);
    let posts = state.repo.get_posts().await?;
    let view = IndexTemplate {
        page: PageContext::new(user, flash),
        posts,
    };
    Ok((jar, HtmlTemplate(view)).into_response())
}

/// show_post
///
/// [Public Route] A post with its comments and the comment form.
#[utoipa::path(
    get,
    path = "/post/{post_id}",
    params(("post_id" = Uuid, Path, description = "Post ID")),
    responses(
        (status = 200, description = "The post", body = String, content_type = "text/html"),
        (status = 303, description = "No such post, redirect to /")
    )
)]
pub async fn show_post(
    MaybeUser(user): MaybeUser,
    State(state): State<AppState>,
    Path(post_id): Path<Uuid>,
    jar: CookieJar,
) -> BlogResult<Response> {
    let (jar, flash) = flash::take(jar);
    let Some(post) = state.repo.get_post(post_id).await? else {
        return Ok(flash::redirect(jar, Denied::PostMissing.message(), "/"));
    };
    let comments = state.repo.get_comments(post_id).await?;

    let is_owner = user.as_ref().is_some_and(|u| u.id == post.author_id);
    let view = PostTemplate {
        page: PageContext::new(user, flash),
        post,
        comments,
        comment_text: String::new(),
        is_owner,
    };
    Ok((jar, HtmlTemplate(view)).into_response())
}

/// add_comment
///
/// [Public Route, login checked here] Adds a comment to a post. Anonymous
/// visitors are sent to the login page.
#[utoipa::path(
    post,
    path = "/post/{post_id}",
    params(("post_id" = Uuid, Path, description = "Post ID")),
    request_body(content = CommentForm, content_type = "application/x-www-form-urlencoded"),
    responses((status = 303, description = "Redirect back to the post, or to /login"))
)]
pub async fn add_comment(
    MaybeUser(user): MaybeUser,
    State(state): State<AppState>,
    Path(post_id): Path<Uuid>,
    jar: CookieJar,
    Form(form): Form<CommentForm>,
) -> BlogResult<Response> {
    let Some(user) = user else {
        let denied = Denied::CommentLoginRequired;
        return Ok(flash::redirect(jar, denied.message(), denied.location()));
    };
    let back = format!("/post/{post_id}");

    let failure = match form.validate() {
        Err(errors) => BlogError::from(errors),
        Ok(()) => match state
            .repo
            .create_comment(&form.comment_text, post_id, user.id)
            .await
        {
            Ok(_) => return Ok(Redirect::to(&back).into_response()),
            Err(e) => e,
        },
    };

    // A comment on a post that vanished has nowhere to go back to.
    let target = match failure {
        BlogError::NotFound(_) => "/",
        _ => back.as_str(),
    };
    let message = failure.into_flash()?;
    Ok(flash::redirect(
        jar,
        format!("There was an issue adding your comment: {message}"),
        target,
    ))
}

/// about
///
/// [Public Route] Static about page.
#[utoipa::path(
    get,
    path = "/about",
    responses((status = 200, description = "About page", body = String, content_type = "text/html"))
)]
pub async fn about(MaybeUser(user): MaybeUser) -> Response {
    HtmlTemplate(AboutTemplate {
        page: PageContext::new(user, None),
    })
    .into_response()
}

/// contact_page
///
/// [Public Route] Shows the contact form.
#[utoipa::path(
    get,
    path = "/contact",
    responses((status = 200, description = "Contact form", body = String, content_type = "text/html"))
)]
pub async fn contact_page(MaybeUser(user): MaybeUser, jar: CookieJar) -> Response {
    let (jar, flash) = flash::take(jar);
    let view = ContactTemplate {
        page: PageContext::new(user, flash),
        form: ContactForm::default(),
        msg_sent: false,
    };
    (jar, HtmlTemplate(view)).into_response()
}

/// contact
///
/// [Public Route] Sends one plaintext email carrying the four form values.
#[utoipa::path(
    post,
    path = "/contact",
    request_body(content = ContactForm, content_type = "application/x-www-form-urlencoded"),
    responses((status = 200, description = "Confirmation or form with a flash message", body = String, content_type = "text/html"))
)]
pub async fn contact(
    MaybeUser(user): MaybeUser,
    State(state): State<AppState>,
    Form(form): Form<ContactForm>,
) -> Response {
    let page = |flash: Option<String>| PageContext::new(user.clone(), flash);

    if let Err(errors) = form.validate() {
        let view = ContactTemplate {
            page: page(Some(BlogError::from(errors).to_string())),
            form,
            msg_sent: false,
        };
        return HtmlTemplate(view).into_response();
    }

    match state.mailer.send(OutgoingMail::contact(&form)).await {
        Ok(()) => HtmlTemplate(ContactTemplate {
            page: page(None),
            form: ContactForm::default(),
            msg_sent: true,
        })
        .into_response(),
        Err(e) => {
            tracing::error!(error = %e, "contact mail failed");
            HtmlTemplate(ContactTemplate {
                page: page(Some(
                    "There was an issue sending your message, please try again later.".to_string(),
                )),
                form,
                msg_sent: false,
            })
            .into_response()
        }
    }
}
