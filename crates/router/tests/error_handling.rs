use http::StatusCode;
use micro_router::{
    BufferedResponse, Failure, HandlerResult, MiddlewareResult, Next, Request, ResponseWriter, Router, RouterBuilder,
    SubContext,
};
use std::io::Write;

#[derive(Default)]
struct Context;

struct AdminContext {
    parent: Context,
}

struct ApiContext {
    parent: Context,
}

impl Context {
    fn error_action(&mut self, _rw: &mut dyn ResponseWriter, _req: &Request) -> HandlerResult {
        panic!("division by zero")
    }

    fn error_middleware(&mut self, _rw: &mut dyn ResponseWriter, _req: &Request) -> MiddlewareResult {
        panic!("root middleware failed")
    }

    fn error_handler(&mut self, rw: &mut dyn ResponseWriter, _req: &Request, _failure: &Failure) -> HandlerResult {
        rw.set_status(StatusCode::INTERNAL_SERVER_ERROR);
        write!(rw, "My Error")?;
        Ok(())
    }

    fn error_handler_secondary(
        &mut self,
        rw: &mut dyn ResponseWriter,
        _req: &Request,
        _failure: &Failure,
    ) -> HandlerResult {
        rw.set_status(StatusCode::INTERNAL_SERVER_ERROR);
        write!(rw, "My Secondary Error")?;
        Ok(())
    }
}

impl AdminContext {
    fn error_action(&mut self, _rw: &mut dyn ResponseWriter, _req: &Request) -> HandlerResult {
        Err("admin action failed".into())
    }

    fn error_middleware(&mut self, _rw: &mut dyn ResponseWriter, _req: &Request) -> MiddlewareResult {
        panic!("admin middleware failed")
    }

    fn error_handler(&mut self, rw: &mut dyn ResponseWriter, _req: &Request, _failure: &Failure) -> HandlerResult {
        rw.set_status(StatusCode::INTERNAL_SERVER_ERROR);
        write!(rw, "Admin Error")?;
        Ok(())
    }
}

impl ApiContext {
    fn error_action(&mut self, _rw: &mut dyn ResponseWriter, _req: &Request) -> HandlerResult {
        panic!("api action failed")
    }

    fn error_handler(&mut self, rw: &mut dyn ResponseWriter, _req: &Request, _failure: &Failure) -> HandlerResult {
        rw.set_status(StatusCode::INTERNAL_SERVER_ERROR);
        write!(rw, "Api Error")?;
        Ok(())
    }
}

macro_rules! sub_context {
    ($name:ident) => {
        impl SubContext<Context> for $name {
            fn from_parent(parent: Context) -> Self {
                Self { parent }
            }

            fn parent(&self) -> &Context {
                &self.parent
            }

            fn parent_mut(&mut self) -> &mut Context {
                &mut self.parent
            }
        }
    };
}

sub_context!(AdminContext);
sub_context!(ApiContext);

fn contextless_error_handler(rw: &mut dyn ResponseWriter, _req: &Request, _failure: &Failure) -> HandlerResult {
    rw.set_status(StatusCode::INTERNAL_SERVER_ERROR);
    write!(rw, "Contextless Error")?;
    Ok(())
}

fn serve(router: &Router, path: &str) -> (StatusCode, String) {
    let parts = http::Request::get(path).body(()).unwrap().into_parts().0;
    let mut rw = BufferedResponse::new();
    router.serve(&mut rw, &parts).unwrap();
    (rw.status(), String::from_utf8(rw.body().to_vec()).unwrap())
}

fn assert_response(router: &Router, path: &str, body: &str) {
    let (status, actual) = serve(router, path);
    assert_eq!(actual.trim(), body, "body of {path}");
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR, "status of {path}");
}

fn with_admin_action(builder: RouterBuilder<Context>) -> RouterBuilder<Context> {
    builder.get("/action", Context::error_action).subrouter::<AdminContext, _>("/admin", |admin| {
        admin.get("/action", AdminContext::error_action)
    })
}

#[test]
fn test_no_error_handler() {
    let router = with_admin_action(Router::builder::<Context>()).build().unwrap();

    assert_response(&router, "/action", "Application Error");
    assert_response(&router, "/admin/action", "Application Error");
}

#[test]
fn test_handler_on_root() {
    let router = with_admin_action(Router::builder::<Context>().error(Context::error_handler)).build().unwrap();

    assert_response(&router, "/action", "My Error");
    assert_response(&router, "/admin/action", "My Error");
}

#[test]
fn test_contextless_error_handler() {
    let router = with_admin_action(Router::builder::<Context>().error(contextless_error_handler)).build().unwrap();

    assert_response(&router, "/action", "Contextless Error");
    assert_response(&router, "/admin/action", "Contextless Error");
}

#[test]
fn test_multiple_error_handlers() {
    let router = Router::builder::<Context>()
        .error(Context::error_handler)
        .get("/action", Context::error_action)
        .subrouter::<AdminContext, _>("/admin", |admin| {
            admin.error(AdminContext::error_handler).get("/action", AdminContext::error_action)
        })
        .build()
        .unwrap();

    assert_response(&router, "/action", "My Error");
    assert_response(&router, "/admin/action", "Admin Error");
}

#[test]
fn test_multiple_error_handlers_without_root() {
    let router = Router::builder::<Context>()
        .get("/action", Context::error_action)
        .subrouter::<AdminContext, _>("/admin", |admin| {
            admin.error(AdminContext::error_handler).get("/action", AdminContext::error_action)
        })
        .subrouter::<ApiContext, _>("/api", |api| {
            api.error(ApiContext::error_handler).get("/action", ApiContext::error_action)
        })
        .build()
        .unwrap();

    assert_response(&router, "/action", "Application Error");
    assert_response(&router, "/admin/action", "Admin Error");
    assert_response(&router, "/api/action", "Api Error");
}

#[test]
fn test_root_middleware_panic() {
    let router = Router::builder::<Context>()
        .middleware(Context::error_middleware)
        .error(Context::error_handler)
        .subrouter::<AdminContext, _>("/admin", |admin| {
            admin.error(AdminContext::error_handler).get("/action", AdminContext::error_action)
        })
        .build()
        .unwrap();

    assert_response(&router, "/admin/action", "My Error");
}

#[test]
fn test_non_root_middleware_panic() {
    let router = Router::builder::<Context>()
        .error(Context::error_handler)
        .subrouter::<AdminContext, _>("/admin", |admin| {
            admin
                .middleware(AdminContext::error_middleware)
                .error(AdminContext::error_handler)
                .get("/action", AdminContext::error_action)
        })
        .build()
        .unwrap();

    assert_response(&router, "/admin/action", "Admin Error");
}

#[test]
fn test_consistent_context() {
    let router = Router::builder::<Context>()
        .error(Context::error_handler)
        .subrouter::<Context, _>("/admin", |admin| {
            admin.error(Context::error_handler_secondary).get("/foo", Context::error_action)
        })
        .build()
        .unwrap();

    assert_response(&router, "/admin/foo", "My Secondary Error");
}

#[test]
fn test_error_handler_replaced() {
    let router = Router::builder::<Context>()
        .error(Context::error_handler)
        .error(Context::error_handler_secondary)
        .get("/action", Context::error_action)
        .build()
        .unwrap();

    assert_response(&router, "/action", "My Secondary Error");
}

#[test]
fn test_failure_reaches_error_handler() {
    fn describe(rw: &mut dyn ResponseWriter, _req: &Request, failure: &Failure) -> HandlerResult {
        rw.set_status(StatusCode::INTERNAL_SERVER_ERROR);
        let kind = if failure.is_panic() { "panic" } else { "error" };
        write!(rw, "{kind}: {}", failure.message())?;
        Ok(())
    }

    let router = with_admin_action(Router::builder::<Context>().error(describe)).build().unwrap();

    assert_response(&router, "/action", "panic: division by zero");
    assert_response(&router, "/admin/action", "error: admin action failed");
}

#[derive(Default)]
struct TracedContext {
    id: u32,
}

struct TracedAdminContext {
    app: TracedContext,
}

impl SubContext<TracedContext> for TracedAdminContext {
    fn from_parent(app: TracedContext) -> Self {
        Self { app }
    }

    fn parent(&self) -> &TracedContext {
        &self.app
    }

    fn parent_mut(&mut self) -> &mut TracedContext {
        &mut self.app
    }
}

impl TracedContext {
    fn assign_id(&mut self, _rw: &mut dyn ResponseWriter, _req: &Request) -> MiddlewareResult {
        self.id = 7;
        Ok(Next::Continue)
    }

    fn failing_middleware(&mut self, _rw: &mut dyn ResponseWriter, _req: &Request) -> MiddlewareResult {
        Err("root middleware refused".into())
    }

    fn report(&mut self, rw: &mut dyn ResponseWriter, _req: &Request, failure: &Failure) -> HandlerResult {
        rw.set_status(StatusCode::BAD_GATEWAY);
        write!(rw, "id={} {}", self.id, failure)?;
        Ok(())
    }
}

impl TracedAdminContext {
    fn bump_and_fail(&mut self, _rw: &mut dyn ResponseWriter, _req: &Request) -> MiddlewareResult {
        self.app.id += 1;
        Err("admin middleware refused".into())
    }

    fn action(&mut self, rw: &mut dyn ResponseWriter, _req: &Request) -> HandlerResult {
        write!(rw, "unreachable")?;
        Ok(())
    }
}

#[test]
fn test_ancestor_handler_sees_shared_context() {
    let router = Router::builder::<TracedContext>()
        .middleware(TracedContext::assign_id)
        .error(TracedContext::report)
        .subrouter::<TracedAdminContext, _>("/admin", |admin| {
            admin.middleware(TracedAdminContext::bump_and_fail).get("/action", TracedAdminContext::action)
        })
        .build()
        .unwrap();

    let (status, body) = serve(&router, "/admin/action");
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body, "id=8 admin middleware refused");
}

#[test]
fn test_root_middleware_error() {
    let router = Router::builder::<TracedContext>()
        .middleware(TracedContext::failing_middleware)
        .error(TracedContext::report)
        .subrouter::<TracedAdminContext, _>("/admin", |admin| admin.get("/action", TracedAdminContext::action))
        .build()
        .unwrap();

    let (status, body) = serve(&router, "/admin/action");
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body, "id=0 root middleware refused");
}

struct BrokenContext {
    parent: Context,
}

impl SubContext<Context> for BrokenContext {
    fn from_parent(_parent: Context) -> Self {
        panic!("cannot build context")
    }

    fn parent(&self) -> &Context {
        &self.parent
    }

    fn parent_mut(&mut self) -> &mut Context {
        &mut self.parent
    }
}

fn broken_action(_ctx: &mut BrokenContext, rw: &mut dyn ResponseWriter, _req: &Request) -> HandlerResult {
    write!(rw, "unreachable")?;
    Ok(())
}

#[test]
fn test_context_constructor_panic() {
    let router = Router::builder::<Context>()
        .error(Context::error_handler)
        .subrouter::<BrokenContext, _>("/broken", |broken| broken.get("/action", broken_action))
        .build()
        .unwrap();

    assert_response(&router, "/broken/action", "Application Error");
}

#[test]
#[should_panic(expected = "error handler exploded")]
fn test_error_handler_panic_is_not_recovered() {
    fn exploding(_rw: &mut dyn ResponseWriter, _req: &Request, _failure: &Failure) -> HandlerResult {
        panic!("error handler exploded")
    }

    let router = Router::builder::<Context>().error(exploding).get("/action", Context::error_action).build().unwrap();
    serve(&router, "/action");
}
