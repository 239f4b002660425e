//! Session middleware
//!
//! Resolves the session id from the request cookie (or mints one), exposes
//! the manager and the request context to handlers, and writes the cookie
//! back on the response when needed.

use axum::Router;
use axum::extract::{Request, State};
use axum::http::{HeaderMap, HeaderValue, header};
use axum::middleware::{Next, from_fn_with_state};
use axum::response::Response;
use tracing::{debug, warn};

use sk_core::{Codec, SessionContext, SessionId, SessionManager};

use crate::cookie::{CookieSigner, find_cookie, session_cookie};

/// Cookie-based identifier transport
///
/// Built once from a manager; cloned into every request.
pub struct CookieTransport<C: Codec> {
    manager: SessionManager<C>,
    signer: Option<CookieSigner>,
}

impl<C: Codec> Clone for CookieTransport<C> {
    fn clone(&self) -> Self {
        Self {
            manager: self.manager.clone(),
            signer: self.signer.clone(),
        }
    }
}

impl<C: Codec> CookieTransport<C> {
    pub fn new(manager: SessionManager<C>) -> Self {
        let signer = manager
            .cookie_settings()
            .secret
            .as_deref()
            .filter(|secret| !secret.trim().is_empty())
            .map(CookieSigner::new);

        Self { manager, signer }
    }

    pub fn manager(&self) -> &SessionManager<C> {
        &self.manager
    }

    /// Context for an inbound request: the presented id if valid, else a new one
    pub fn resolve(&self, headers: &HeaderMap) -> SessionContext {
        let name = &self.manager.cookie_settings().name;
        let Some(raw) = find_cookie(headers, name) else {
            return SessionContext::fresh();
        };

        let id = match &self.signer {
            Some(signer) => signer.verify(&raw),
            None => SessionId::parse(&raw),
        };

        match id {
            Some(id) => SessionContext::new(id),
            None => {
                debug!("Rejected invalid session cookie, minting a new id");
                SessionContext::fresh()
            }
        }
    }

    /// `Set-Cookie` value to send for this context, if any
    pub fn outbound_cookie(&self, ctx: &SessionContext) -> Option<HeaderValue> {
        let settings = self.manager.cookie_settings();
        let persist = ctx.is_fresh() || (settings.always_save && ctx.is_modified());
        if !persist {
            return None;
        }

        let value = match &self.signer {
            Some(signer) => signer.sign(ctx.id()),
            None => ctx.id().to_string(),
        };

        let cookie = session_cookie(settings, value);
        match HeaderValue::from_str(&cookie.to_string()) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!("Could not encode session cookie: {}", e);
                None
            }
        }
    }
}

/// Session middleware, for use with `from_fn_with_state`
pub async fn session_middleware<C: Codec>(
    State(transport): State<CookieTransport<C>>,
    mut request: Request,
    next: Next,
) -> Response {
    let ctx = transport.resolve(request.headers());

    request.extensions_mut().insert(ctx.clone());
    request.extensions_mut().insert(transport.manager().clone());

    let mut response = next.run(request).await;

    if let Some(cookie) = transport.outbound_cookie(&ctx) {
        debug!("Persisting session cookie for {}", ctx.id());
        response.headers_mut().append(header::SET_COOKIE, cookie);
    }

    response
}

/// Wrap every route of `router` in the session middleware
pub fn with_sessions<C, S>(router: Router<S>, manager: SessionManager<C>) -> Router<S>
where
    C: Codec,
    S: Clone + Send + Sync + 'static,
{
    let transport = CookieTransport::new(manager);
    router.layer(from_fn_with_state(transport, session_middleware::<C>))
}
