use actix_web::http::header::{HeaderName, HeaderValue};
use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    Error, HttpMessage,
};
use actix_web::{FromRequest, HttpRequest};
use futures::future::{ok, Ready};
use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;
use uuid::Uuid;

pub const SESSION_HEADER: &str = "x-session-id";

/// Resolves the dashboard session for every request from the `X-Session-Id` header.
///
/// Requests without a valid id get a fresh one. The resolved id is stored in the request
/// extensions and echoed back on the response.
#[derive(Clone, Default)]
pub struct SessionMiddleware;

impl<S, B> Transform<S, ServiceRequest> for SessionMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Transform = SessionMiddlewareService<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ok(SessionMiddlewareService {
            service: Rc::new(service),
        })
    }
}

pub struct SessionMiddlewareService<S> {
    service: Rc<S>,
}

fn session_from_header(req: &HttpRequest) -> Option<Uuid> {
    req.headers()
        .get(SESSION_HEADER)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| Uuid::parse_str(value.trim()).ok())
}

impl<S, B> Service<ServiceRequest> for SessionMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>>>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = self.service.clone();

        Box::pin(async move {
            let session = match session_from_header(req.request()) {
                Some(id) => id,
                None => {
                    let id = Uuid::new_v4();
                    log::debug!("Starting new session {} for {}", id, req.path());
                    id
                }
            };
            req.extensions_mut().insert(SessionId(session));

            let mut res = service.call(req).await?;
            if let Ok(value) = HeaderValue::from_str(&session.to_string()) {
                res.headers_mut()
                    .insert(HeaderName::from_static(SESSION_HEADER), value);
            }
            Ok(res)
        })
    }
}

/// The caller's session id, as resolved by `SessionMiddleware`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionId(pub Uuid);

impl FromRequest for SessionId {
    type Error = actix_web::Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut actix_web::dev::Payload) -> Self::Future {
        if let Some(session) = req.extensions().get::<SessionId>() {
            return ok(*session);
        }
        log::warn!(
            "SessionId extractor: no session resolved for path {}, falling back to header",
            req.path()
        );
        ok(SessionId(session_from_header(req).unwrap_or_else(Uuid::new_v4)))
    }
}
