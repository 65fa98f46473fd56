use std::io::Write;
use std::sync::Arc;

use http::StatusCode;
use http_body_util::BodyExt;
use micro_router::{Failure, HandlerResult, MiddlewareResult, Next, Request, ResponseWriter, Router, SubContext};
use tracing::{Level, error, info};
use tracing_subscriber::FmtSubscriber;

#[derive(Default)]
struct AppContext {
    request_id: u64,
}

struct AdminContext {
    app: AppContext,
    user: Option<String>,
}

impl SubContext<AppContext> for AdminContext {
    fn from_parent(app: AppContext) -> Self {
        Self { app, user: None }
    }

    fn parent(&self) -> &AppContext {
        &self.app
    }

    fn parent_mut(&mut self) -> &mut AppContext {
        &mut self.app
    }
}

impl AppContext {
    fn assign_request_id(&mut self, _rw: &mut dyn ResponseWriter, req: &Request) -> MiddlewareResult {
        self.request_id = req.path().len() as u64;
        Ok(Next::Continue)
    }

    fn index(&mut self, rw: &mut dyn ResponseWriter, _req: &Request) -> HandlerResult {
        write!(rw, "hello, request {}", self.request_id)?;
        Ok(())
    }

    fn on_error(&mut self, rw: &mut dyn ResponseWriter, _req: &Request, failure: &Failure) -> HandlerResult {
        rw.set_status(StatusCode::INTERNAL_SERVER_ERROR);
        write!(rw, "request {} failed: {}", self.request_id, failure.message())?;
        Ok(())
    }
}

impl AdminContext {
    fn authenticate(&mut self, rw: &mut dyn ResponseWriter, req: &Request) -> MiddlewareResult {
        match req.headers().get(http::header::AUTHORIZATION).and_then(|value| value.to_str().ok()) {
            Some(user) => {
                self.user = Some(user.to_owned());
                Ok(Next::Continue)
            }
            None => {
                rw.set_status(StatusCode::UNAUTHORIZED);
                write!(rw, "who are you?")?;
                Ok(Next::Stop)
            }
        }
    }

    fn user(&mut self, rw: &mut dyn ResponseWriter, req: &Request) -> HandlerResult {
        let id = req.path_params().get("id").unwrap_or_default();
        let id: u32 = id.parse()?;
        write!(rw, "user {id}, viewed by {}", self.user.as_deref().unwrap_or_default())?;
        Ok(())
    }
}

#[tokio::main]
async fn main() {
    let subscriber = FmtSubscriber::builder().with_max_level(Level::DEBUG).finish();
    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    let router = Router::builder::<AppContext>()
        .middleware(AppContext::assign_request_id)
        .error(AppContext::on_error)
        .get("/", AppContext::index)
        .subrouter::<AdminContext, _>("/admin", |admin| {
            admin.middleware(AdminContext::authenticate).get("/users/{id}", AdminContext::user)
        })
        .build();

    let router = match router {
        Ok(router) => Arc::new(router),
        Err(e) => {
            error!(cause = %e, "invalid router");
            return;
        }
    };

    let requests = [
        ("/", None),
        ("/admin/users/7", Some("alice")),
        ("/admin/users/7", None),
        ("/admin/users/x", Some("alice")),
        ("/missing", None),
    ];

    for (path, user) in requests {
        let mut builder = http::Request::get(path);
        if let Some(user) = user {
            builder = builder.header(http::header::AUTHORIZATION, user);
        }
        let request = builder.body(()).expect("request should be valid");

        let router = router.clone();
        let result = tokio::task::spawn_blocking(move || router.call(request)).await.expect("dispatch task panicked");

        match result {
            Ok(response) => {
                let status = response.status();
                let body = response.into_body().collect().await.expect("body is infallible").to_bytes();
                info!(path, %status, body = %String::from_utf8_lossy(&body), "served");
            }
            Err(e) => error!(path, cause = %e, "dispatch failed"),
        }
    }
}
