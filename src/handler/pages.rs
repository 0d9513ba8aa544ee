//! Page operation handlers
//!
//! Every handler receives a title that already passed validation.
//! A fresh `Page` is built per call; nothing outlives the request.

use super::request::{WikiRequest, WikiResponse};
use crate::error::WikiError;
use crate::logger;
use crate::render::{Renderer, TemplateName};
use crate::routing::Operation;
use crate::storage::{Page, PageStore, Title};

/// Form field carrying new page content on save
pub const BODY_FIELD: &str = "body";

/// Collaborators shared by all handlers for one request
pub struct PageContext<'a> {
    pub store: &'a dyn PageStore,
    pub renderer: &'a dyn Renderer,
}

/// Show a page, or send the client to create it
pub fn view(_req: &WikiRequest, title: &Title, ctx: &PageContext<'_>) -> WikiResponse {
    match ctx.store.load(title) {
        Ok(page) => render(ctx, TemplateName::View, &page),
        Err(WikiError::NotFound(_)) => WikiResponse::Redirect(Operation::Edit.path_for(title)),
        Err(e) => server_error(&e),
    }
}

/// Show the editor, with an empty page for titles not stored yet
pub fn edit(_req: &WikiRequest, title: &Title, ctx: &PageContext<'_>) -> WikiResponse {
    let page = match ctx.store.load(title) {
        Ok(page) => page,
        Err(WikiError::NotFound(_)) => Page::empty(title.clone()),
        Err(e) => return server_error(&e),
    };
    render(ctx, TemplateName::Edit, &page)
}

/// Persist the submitted body, then show the page
///
/// A body in an encoding other than a urlencoded form is refused rather
/// than read as an empty field, so the stored page is left alone.
pub fn save(req: &WikiRequest, title: &Title, ctx: &PageContext<'_>) -> WikiResponse {
    if req.has_unread_body() {
        tracing::debug!(title = %title, "save body not form-encoded");
        return WikiResponse::UnsupportedMediaType;
    }
    let page = Page::new(title.clone(), req.form_value(BODY_FIELD));
    match ctx.store.save(&page) {
        Ok(()) => WikiResponse::Redirect(Operation::View.path_for(title)),
        Err(e) => server_error(&e),
    }
}

/// Bare `/{title}`: canonicalize to the view path
pub fn alias(_req: &WikiRequest, title: &Title, _ctx: &PageContext<'_>) -> WikiResponse {
    WikiResponse::Redirect(Operation::View.path_for(title))
}

fn render(ctx: &PageContext<'_>, name: TemplateName, page: &Page) -> WikiResponse {
    match ctx.renderer.render(name, page) {
        Ok(html) => WikiResponse::Html(html),
        Err(e) => server_error(&e),
    }
}

fn server_error(err: &WikiError) -> WikiResponse {
    if err.status_code() == 404 {
        return WikiResponse::NotFound;
    }
    logger::log_error(&err.to_string());
    WikiResponse::ServerError(err.to_string())
}
