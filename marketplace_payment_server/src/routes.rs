//! Request handler definitions
//!
//! Define each route and its handler here.
//! Handlers that are more than a line or two MUST go into the engine or an integration module. Keep this module neat
//! and tidy 🙏
//!
//! A note about performance:
//! Since each worker thread processes its requests sequentially, handlers which block the current thread will cause the
//! current worker to stop processing new requests. Every store and gateway call is therefore async.
use actix_web::{get, web, HttpResponse, Responder};
use log::*;
use marketplace_payment_engine::{
    traits::{MarketplaceDatabase, PaymentGateway},
    CheckoutApi,
    MerchantAccountApi,
    PayoutOutcome,
    WebhookApi,
    WebhookOutcome,
};
use stripe_tools::StripeEvent;

use crate::{
    data_objects::{
        ConfirmPaymentRequest,
        ConfirmPaymentResponse,
        ConnectAccountRequest,
        CreatePaymentIntentRequest,
        LinkResponse,
        PaymentIntentResponse,
        UserQuery,
        WebhookReceipt,
    },
    errors::ServerError,
    integrations::stripe::to_gateway_event,
};

// Web-actix cannot handle generics in handlers, so it's implemented manually using the `route!` macro
#[macro_export]
macro_rules! route {
    ($name:ident => $method:ident $path:literal impl $($bounds:ty),+) => {
        paste::paste! { pub struct [<$name:camel Route>]< $( [< T $bounds:camel> ],)+ >( $( core::marker::PhantomData<fn() -> [< T $bounds:camel> ] >,)+ );}
        paste::paste! { impl< $( [< T $bounds:camel> ],)+ > [<$name:camel Route>]< $( [< T $bounds:camel> ],)+ > {
            #[allow(clippy::new_without_default)]
            pub fn new() -> Self {
                Self($( core::marker::PhantomData::<fn() -> [< T $bounds:camel> ] >,)+)
            }
        }}
        paste::paste! { impl<$( [< T $bounds:camel >] , )+> actix_web::dev::HttpServiceFactory for [<$name:camel Route>]<$([<T $bounds:camel>],)+>
        where
            $([<T $bounds:camel>]: $bounds + 'static,)+
        {
            fn register(self, config: &mut actix_web::dev::AppService) {
                let res = actix_web::Resource::new($path)
                    .name(stringify!($name))
                    .guard(actix_web::guard::$method())
                    .to($name::< $( [< T $bounds:camel >], )+>);
                actix_web::dev::HttpServiceFactory::register(res, config);
            }
        }}
    };
}

// ----------------------------------------------   Health  ----------------------------------------------------
#[get("/health")]
pub async fn health() -> impl Responder {
    trace!("💻️ Received health check request");
    HttpResponse::Ok().body("👍️\n")
}

//----------------------------------------------   Checkout  ----------------------------------------------------
route!(create_payment_intent => Post "/create-payment-intent" impl MarketplaceDatabase, PaymentGateway);
/// Starts checkout for a cart.
///
/// Carts with seller items get a marketplace payment intent, whose metadata drives the seller payouts once the payment
/// succeeds. Every seller in the cart must have connected a merchant account.
pub async fn create_payment_intent<B, G>(
    body: web::Json<CreatePaymentIntentRequest>,
    api: web::Data<CheckoutApi<B, G>>,
) -> Result<HttpResponse, ServerError>
where
    B: MarketplaceDatabase,
    G: PaymentGateway,
{
    let (cart_id, user_id) = body.into_inner().validate()?;
    debug!("💻️ Payment intent requested for cart {cart_id} by {user_id}");
    let result = api.create_payment_intent(&cart_id, &user_id).await.map_err(|e| {
        warn!("💻️ Could not create a payment intent for cart {cart_id}. {e}");
        e
    })?;
    Ok(HttpResponse::Ok().json(PaymentIntentResponse::from(result)))
}

route!(confirm_payment => Post "/confirm-payment" impl MarketplaceDatabase, PaymentGateway);
/// Called by the buyer's browser once the payment has gone through. Safe to call more than once.
pub async fn confirm_payment<B, G>(
    body: web::Json<ConfirmPaymentRequest>,
    api: web::Data<CheckoutApi<B, G>>,
) -> Result<HttpResponse, ServerError>
where
    B: MarketplaceDatabase,
    G: PaymentGateway,
{
    let (payment_intent_id, cart_id) = body.into_inner().validate()?;
    debug!("💻️ Payment confirmation for cart {cart_id} with {payment_intent_id}");
    let confirmation = api.confirm_payment(&payment_intent_id, &cart_id).await.map_err(|e| {
        warn!("💻️ Could not confirm payment {payment_intent_id} for cart {cart_id}. {e}");
        e
    })?;
    Ok(HttpResponse::Ok().json(ConfirmPaymentResponse::from(confirmation)))
}

//----------------------------------------------   Sellers  ----------------------------------------------------
route!(create_connected_account => Post "/create-connected-account" impl MarketplaceDatabase, PaymentGateway);
pub async fn create_connected_account<B, G>(
    body: web::Json<ConnectAccountRequest>,
    api: web::Data<MerchantAccountApi<B, G>>,
) -> Result<HttpResponse, ServerError>
where
    B: MarketplaceDatabase,
    G: PaymentGateway,
{
    let req = body.into_inner().validate()?;
    debug!("💻️ Connected account requested for {}", req.user_id);
    let link = api.create_connected_account(&req.user_id, &req.email, req.profile).await.map_err(|e| {
        warn!("💻️ Could not set up a connected account for {}. {e}", req.user_id);
        e
    })?;
    Ok(HttpResponse::Ok().json(link))
}

route!(get_account_status => Get "/get-account-status" impl MarketplaceDatabase, PaymentGateway);
pub async fn get_account_status<B, G>(
    query: web::Query<UserQuery>,
    api: web::Data<MerchantAccountApi<B, G>>,
) -> Result<HttpResponse, ServerError>
where
    B: MarketplaceDatabase,
    G: PaymentGateway,
{
    let user_id = query.into_inner().validate()?;
    trace!("💻️ Account status requested for {user_id}");
    let status = api.get_account_status(&user_id).await?;
    Ok(HttpResponse::Ok().json(status))
}

route!(refresh_account_link => Get "/refresh-account-link" impl MarketplaceDatabase, PaymentGateway);
pub async fn refresh_account_link<B, G>(
    query: web::Query<UserQuery>,
    api: web::Data<MerchantAccountApi<B, G>>,
) -> Result<HttpResponse, ServerError>
where
    B: MarketplaceDatabase,
    G: PaymentGateway,
{
    let user_id = query.into_inner().validate()?;
    let url = api.refresh_account_link(&user_id).await?;
    Ok(HttpResponse::Ok().json(LinkResponse { url }))
}

route!(get_dashboard_link => Get "/get-dashboard-link" impl MarketplaceDatabase, PaymentGateway);
pub async fn get_dashboard_link<B, G>(
    query: web::Query<UserQuery>,
    api: web::Data<MerchantAccountApi<B, G>>,
) -> Result<HttpResponse, ServerError>
where
    B: MarketplaceDatabase,
    G: PaymentGateway,
{
    let user_id = query.into_inner().validate()?;
    let url = api.get_dashboard_link(&user_id).await?;
    Ok(HttpResponse::Ok().json(LinkResponse { url }))
}

//----------------------------------------------   Webhooks  ----------------------------------------------------
route!(stripe_webhook => Post "" impl MarketplaceDatabase, PaymentGateway);
/// Receives Stripe webhook events.
///
/// This route must be wrapped in [`crate::middleware::StripeSignatureMiddlewareFactory`]; see
/// [`crate::server::webhook_scope`]. The signature has already been verified by the time the handler runs.
///
/// Stripe redelivers any event that does not get a 2xx response. Unknown event types and per-seller payout failures
/// are therefore acknowledged, and only failures that affect the whole event return an error.
pub async fn stripe_webhook<B, G>(body: web::Bytes, api: web::Data<WebhookApi<B, G>>) -> Result<HttpResponse, ServerError>
where
    B: MarketplaceDatabase,
    G: PaymentGateway,
{
    let event = serde_json::from_slice::<StripeEvent>(&body).map_err(|e| {
        warn!("🪝 Could not parse the webhook payload. {e}");
        ServerError::InvalidRequestBody(e.to_string())
    })?;
    info!("🪝 Received {} event {}", event.event_type, event.id);
    let event = to_gateway_event(event).map_err(|e| {
        warn!("🪝 {e}");
        ServerError::InvalidRequestBody(e.to_string())
    })?;
    let outcome = api.process_event(event).await.map_err(|e| {
        error!("🪝 Webhook processing failed. The event will be redelivered. {e}");
        e
    })?;
    log_outcome(&outcome);
    Ok(HttpResponse::Ok().json(WebhookReceipt { received: true }))
}

fn log_outcome(outcome: &WebhookOutcome) {
    match outcome {
        WebhookOutcome::AccountUpdated { user_id, onboarded: true } => {
            info!("🪝 Seller {user_id} has finished onboarding")
        },
        WebhookOutcome::AccountUpdated { user_id, .. } => debug!("🪝 Merchant account of {user_id} updated"),
        WebhookOutcome::UnknownAccount(id) => info!("🪝 No seller is linked to account {id}. Nothing to do"),
        WebhookOutcome::Payouts(payouts) => {
            for p in payouts {
                match &p.outcome {
                    PayoutOutcome::Transferred(id) => info!("🪝 Seller {} paid with transfer {id}", p.seller_id),
                    PayoutOutcome::Duplicate => debug!("🪝 Seller {} was already paid", p.seller_id),
                    PayoutOutcome::Skipped(reason) => warn!("🪝 Seller {} skipped. {reason}", p.seller_id),
                    PayoutOutcome::Failed(reason) => error!("🪝 Payout to seller {} failed. {reason}", p.seller_id),
                }
            }
        },
        WebhookOutcome::Ignored(reason) => trace!("🪝 Ignored. {reason}"),
    }
}
