//! Operation dispatcher
//!
//! Binds path prefixes to page handlers. Every handler is registered through
//! `wrap`, which validates the path before the handler body ever runs.

use hyper::Method;

use super::pages::{self, PageContext};
use super::request::{WikiRequest, WikiResponse};
use crate::routing::{self, Grammar, Operation};
use crate::storage::Title;

/// Handler body operating on a trusted title
pub type PageHandler = fn(&WikiRequest, &Title, &PageContext<'_>) -> WikiResponse;

/// Handler after wrapping: takes the raw request
pub type BoundHandler = Box<dyn Fn(&WikiRequest, &PageContext<'_>) -> WikiResponse + Send + Sync>;

/// Decorate `handler` with title extraction and method checks
///
/// The returned handler answers `NotFound` for any path that fails the
/// grammar or resolves to a different operation, and `MethodNotAllowed`
/// for methods outside `methods` (HEAD is accepted wherever GET is).
pub fn wrap(
    grammar: Grammar,
    operation: Operation,
    methods: Vec<Method>,
    handler: PageHandler,
) -> BoundHandler {
    let allow = allow_header(&methods);
    Box::new(move |req: &WikiRequest, ctx: &PageContext<'_>| {
        let route = match routing::validate(&req.path, grammar) {
            Ok(route) if route.operation == operation => route,
            Ok(route) => {
                tracing::debug!(
                    path = %req.path,
                    expected = operation.as_str(),
                    found = route.operation.as_str(),
                    "operation mismatch"
                );
                return WikiResponse::NotFound;
            }
            Err(e) => {
                tracing::debug!(error = %e, "rejected request path");
                return WikiResponse::NotFound;
            }
        };

        if !method_allowed(&methods, &req.method) {
            return WikiResponse::MethodNotAllowed(allow.clone());
        }

        handler(req, &route.title, ctx)
    })
}

fn method_allowed(methods: &[Method], method: &Method) -> bool {
    methods.contains(method) || (*method == Method::HEAD && methods.contains(&Method::GET))
}

fn allow_header(methods: &[Method]) -> String {
    let mut names: Vec<&str> = methods.iter().map(Method::as_str).collect();
    if methods.contains(&Method::GET) && !methods.contains(&Method::HEAD) {
        names.push("HEAD");
    }
    names.join(", ")
}

struct Binding {
    prefix: &'static str,
    handler: BoundHandler,
}

/// Registry of operations, selected by path prefix
pub struct Dispatcher {
    grammar: Grammar,
    bindings: Vec<Binding>,
    fallback: Option<BoundHandler>,
}

impl Dispatcher {
    /// Empty dispatcher; nothing answers until operations are registered
    pub const fn empty(grammar: Grammar) -> Self {
        Self {
            grammar,
            bindings: Vec::new(),
            fallback: None,
        }
    }

    /// Dispatcher with view, edit, and save bound, plus the bare-title
    /// alias when the grammar is permissive
    pub fn new(grammar: Grammar) -> Self {
        let mut dispatcher = Self::empty(grammar);
        dispatcher.register("/view/", Operation::View, vec![Method::GET], pages::view);
        dispatcher.register(
            "/edit/",
            Operation::Edit,
            vec![Method::GET, Method::POST],
            pages::edit,
        );
        dispatcher.register("/save/", Operation::Save, vec![Method::POST], pages::save);
        if grammar == Grammar::Permissive {
            dispatcher.set_fallback(Operation::Alias, vec![Method::GET], pages::alias);
        }
        dispatcher
    }

    /// Bind `operation` to every path starting with `prefix`
    pub fn register(
        &mut self,
        prefix: &'static str,
        operation: Operation,
        methods: Vec<Method>,
        handler: PageHandler,
    ) {
        self.bindings.push(Binding {
            prefix,
            handler: wrap(self.grammar, operation, methods, handler),
        });
    }

    /// Handler for paths no prefix claims
    pub fn set_fallback(&mut self, operation: Operation, methods: Vec<Method>, handler: PageHandler) {
        self.fallback = Some(wrap(self.grammar, operation, methods, handler));
    }

    pub fn dispatch(&self, req: &WikiRequest, ctx: &PageContext<'_>) -> WikiResponse {
        let handler = self
            .bindings
            .iter()
            .find(|binding| req.path.starts_with(binding.prefix))
            .map(|binding| &binding.handler)
            .or(self.fallback.as_ref());

        match handler {
            Some(handler) => {
                let response = handler(req, ctx);
                tracing::debug!(path = %req.path, status = response.status(), "page operation done");
                response
            }
            None => {
                tracing::debug!(path = %req.path, "no operation bound");
                WikiResponse::NotFound
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::TemplateSet;
    use crate::storage::{FileStore, PageStore};
    use tempfile::TempDir;

    struct Fixture {
        _dir: TempDir,
        store: FileStore,
        renderer: TemplateSet,
    }

    impl Fixture {
        fn new() -> Self {
            let dir = TempDir::new().unwrap();
            let store = FileStore::new(dir.path());
            Self {
                _dir: dir,
                store,
                renderer: TemplateSet::builtin().unwrap(),
            }
        }

        fn ctx(&self) -> PageContext<'_> {
            PageContext {
                store: &self.store,
                renderer: &self.renderer,
            }
        }
    }

    fn get(path: &str) -> WikiRequest {
        WikiRequest::new(Method::GET, path)
    }

    fn post_body(path: &str, body: &str) -> WikiRequest {
        WikiRequest::new(Method::POST, path).with_field(pages::BODY_FIELD, body)
    }

    fn title(raw: &str) -> Title {
        Title::parse(raw).unwrap()
    }

    #[test]
    fn test_invalid_paths_never_reach_handlers() {
        fn must_not_run(_: &WikiRequest, _: &Title, _: &PageContext<'_>) -> WikiResponse {
            panic!("handler invoked for invalid path");
        }

        let fx = Fixture::new();
        let mut dispatcher = Dispatcher::empty(Grammar::Strict);
        dispatcher.register("/view/", Operation::View, vec![Method::GET], must_not_run);

        for path in ["/view/../etc", "/view/", "/view/a.b", "/view/a/b"] {
            assert_eq!(dispatcher.dispatch(&get(path), &fx.ctx()), WikiResponse::NotFound);
        }
    }

    #[test]
    fn test_unknown_operation_is_not_found() {
        let fx = Fixture::new();
        let dispatcher = Dispatcher::new(Grammar::Strict);
        assert_eq!(dispatcher.dispatch(&get("/delete/Foo"), &fx.ctx()), WikiResponse::NotFound);
        assert_eq!(dispatcher.dispatch(&get("/Foo"), &fx.ctx()), WikiResponse::NotFound);
        assert_eq!(dispatcher.dispatch(&get("/"), &fx.ctx()), WikiResponse::NotFound);
    }

    #[test]
    fn test_method_checks() {
        let fx = Fixture::new();
        let dispatcher = Dispatcher::new(Grammar::Strict);

        let resp = dispatcher.dispatch(&get("/save/Foo"), &fx.ctx());
        assert_eq!(resp, WikiResponse::MethodNotAllowed("POST".to_string()));

        let resp = dispatcher.dispatch(&WikiRequest::new(Method::DELETE, "/view/Foo"), &fx.ctx());
        assert_eq!(resp, WikiResponse::MethodNotAllowed("GET, HEAD".to_string()));

        // HEAD rides along with GET
        let resp = dispatcher.dispatch(&WikiRequest::new(Method::HEAD, "/view/Foo"), &fx.ctx());
        assert_eq!(resp, WikiResponse::Redirect("/edit/Foo".to_string()));

        // Invalid path wins over a wrong method
        let resp = dispatcher.dispatch(&WikiRequest::new(Method::DELETE, "/view/../x"), &fx.ctx());
        assert_eq!(resp, WikiResponse::NotFound);
    }

    #[test]
    fn test_scenario_missing_page_flow() {
        let fx = Fixture::new();
        let dispatcher = Dispatcher::new(Grammar::Strict);

        assert!(fx.store.load(&title("Missing")).is_err());
        let resp = dispatcher.dispatch(&get("/view/Missing"), &fx.ctx());
        assert_eq!(resp, WikiResponse::Redirect("/edit/Missing".to_string()));
    }

    #[test]
    fn test_scenario_edit_new_page() {
        let fx = Fixture::new();
        let dispatcher = Dispatcher::new(Grammar::Strict);

        let WikiResponse::Html(html) = dispatcher.dispatch(&get("/edit/NewPage"), &fx.ctx()) else {
            panic!("expected edit form");
        };
        assert!(html.contains("Editing NewPage"));
        assert!(html.contains("></textarea>"));
        assert!(!fx.store.key(&title("NewPage")).exists());
    }

    #[test]
    fn test_scenario_save_overwrites_and_view_shows_it() {
        let fx = Fixture::new();
        let dispatcher = Dispatcher::new(Grammar::Strict);

        let resp = dispatcher.dispatch(&post_body("/save/TestPage", "This is a sample content"), &fx.ctx());
        assert_eq!(resp, WikiResponse::Redirect("/view/TestPage".to_string()));

        let resp = dispatcher.dispatch(&post_body("/save/TestPage", "Updated text"), &fx.ctx());
        assert_eq!(resp, WikiResponse::Redirect("/view/TestPage".to_string()));

        let WikiResponse::Html(html) = dispatcher.dispatch(&get("/view/TestPage"), &fx.ctx()) else {
            panic!("expected rendered page");
        };
        assert!(html.contains("Updated text"));
        assert!(!html.contains("sample content"));
    }

    #[test]
    fn test_edit_accepts_post() {
        let fx = Fixture::new();
        let dispatcher = Dispatcher::new(Grammar::Strict);
        let resp = dispatcher.dispatch(&WikiRequest::new(Method::POST, "/edit/Foo"), &fx.ctx());
        assert_eq!(resp.status(), 200);
    }

    #[test]
    fn test_permissive_alias() {
        let fx = Fixture::new();
        let dispatcher = Dispatcher::new(Grammar::Permissive);

        assert_eq!(
            dispatcher.dispatch(&get("/Foo"), &fx.ctx()),
            WikiResponse::Redirect("/view/Foo".to_string())
        );
        assert_eq!(
            dispatcher.dispatch(&get("/view"), &fx.ctx()),
            WikiResponse::Redirect("/view/view".to_string())
        );
        assert_eq!(dispatcher.dispatch(&get("/delete/Foo"), &fx.ctx()), WikiResponse::NotFound);
        assert_eq!(dispatcher.dispatch(&get("/view/"), &fx.ctx()), WikiResponse::NotFound);
        assert_eq!(
            dispatcher.dispatch(&get("/view/Foo"), &fx.ctx()),
            WikiResponse::Redirect("/edit/Foo".to_string())
        );
    }

    #[test]
    fn test_allow_header() {
        assert_eq!(allow_header(&[Method::GET]), "GET, HEAD");
        assert_eq!(allow_header(&[Method::GET, Method::POST]), "GET, POST, HEAD");
        assert_eq!(allow_header(&[Method::POST]), "POST");
    }
}
