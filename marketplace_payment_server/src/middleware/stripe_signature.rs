//! Stripe webhook signature middleware for Actix Web.
//!
//! Stripe signs every webhook delivery with the endpoint's signing secret and sends the signature in the
//! `Stripe-Signature` header. The signature covers the raw request body, so it has to be checked before anything
//! parses the body.
//!
//! Requests with a missing, stale or invalid signature are rejected with a `400 Bad Request` and never reach the
//! handler. Verified requests get their body back and carry on as normal.

use std::{
    future::{ready, Ready},
    rc::Rc,
};

use actix_http::h1;
use actix_web::{
    dev::{forward_ready, Payload, Service, ServiceRequest, ServiceResponse, Transform},
    web,
    Error,
};
use futures::future::LocalBoxFuture;
use log::{trace, warn};
use mpg_common::Secret;
use stripe_tools::{verify_signature, WebhookSignatureError, SIGNATURE_HEADER};

use crate::errors::ServerError;

pub struct StripeSignatureMiddlewareFactory {
    secret: Secret<String>,
    tolerance_secs: i64,
}

impl StripeSignatureMiddlewareFactory {
    pub fn new(secret: Secret<String>, tolerance_secs: i64) -> Self {
        StripeSignatureMiddlewareFactory { secret, tolerance_secs }
    }
}

impl<S, B> Transform<S, ServiceRequest> for StripeSignatureMiddlewareFactory
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Error = Error;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;
    type InitError = ();
    type Response = ServiceResponse<B>;
    type Transform = StripeSignatureMiddlewareService<S>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(StripeSignatureMiddlewareService {
            secret: self.secret.clone(),
            tolerance_secs: self.tolerance_secs,
            service: Rc::new(service),
        }))
    }
}

pub struct StripeSignatureMiddlewareService<S> {
    secret: Secret<String>,
    tolerance_secs: i64,
    service: Rc<S>,
}

impl<S, B> Service<ServiceRequest> for StripeSignatureMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;
    type Response = ServiceResponse<B>;

    forward_ready!(service);

    fn call(&self, mut req: ServiceRequest) -> Self::Future {
        let service = Rc::clone(&self.service);
        let secret = self.secret.reveal().clone();
        let tolerance = self.tolerance_secs;
        Box::pin(async move {
            trace!("🔐️ Checking Stripe signature for request");
            let data = req.extract::<web::Bytes>().await.map_err(|e| {
                warn!("🔐️ Failed to extract request data: {e:?}");
                ServerError::InvalidRequestBody("Failed to extract request data.".into())
            })?;
            let header = req
                .headers()
                .get(SIGNATURE_HEADER)
                .and_then(|v| v.to_str().ok())
                .map(String::from)
                .ok_or(WebhookSignatureError::MissingHeader)
                .map_err(|e| {
                    warn!("🔐️ No Stripe signature found in request. Denying access.");
                    ServerError::from(e)
                })?;
            let now = chrono::Utc::now().timestamp();
            verify_signature(data.as_ref(), &header, &secret, tolerance, now).map_err(|e| {
                warn!("🔐️ Invalid Stripe signature found in request. Denying access. {e}");
                ServerError::from(e)
            })?;
            trace!("🔐️ Stripe signature check for request ✅️");
            req.set_payload(bytes_to_payload(data));
            service.call(req).await
        })
    }
}

fn bytes_to_payload(buf: web::Bytes) -> Payload {
    let (_, mut pl) = h1::Payload::create(true);
    pl.unread_data(buf);
    Payload::from(pl)
}
