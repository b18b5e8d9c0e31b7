use std::time::Duration;

use actix_cors::Cors;
use actix_web::{
    dev::Server,
    error::JsonPayloadError,
    http::KeepAlive,
    middleware::Logger,
    web,
    App,
    Error,
    HttpRequest,
    HttpServer,
};
use futures::future::BoxFuture;
use log::*;
use marketplace_payment_engine::{
    events::{EventHandlers, EventHooks, EventProducers},
    traits::{MarketplaceDatabase, PaymentGateway},
    CheckoutApi,
    MerchantAccountApi,
    SqliteDatabase,
    WebhookApi,
};

use crate::{
    config::ServerConfig,
    errors::ServerError,
    integrations::{email::create_email_event_handlers, stripe::StripeGateway},
    middleware::StripeSignatureMiddlewareFactory,
    routes::{
        health,
        ConfirmPaymentRoute,
        CreateConnectedAccountRoute,
        CreatePaymentIntentRoute,
        GetAccountStatusRoute,
        GetDashboardLinkRoute,
        RefreshAccountLinkRoute,
        StripeWebhookRoute,
    },
};

const AUDIT_EVENT_BUFFER_SIZE: usize = 50;

pub async fn run_server(config: ServerConfig) -> Result<(), ServerError> {
    let db = SqliteDatabase::new_with_url(&config.database_url, 25)
        .await
        .map_err(|e| ServerError::InitializeError(e.to_string()))?;
    db.run_migrations().await.map_err(|e| ServerError::InitializeError(format!("Migrations failed. {e}")))?;
    let gateway = StripeGateway::new(config.stripe.clone()).map_err(|e| ServerError::InitializeError(e.to_string()))?;
    let mut producers = EventProducers::default();
    for handlers in create_event_handlers(&config)? {
        producers.extend(handlers.producers());
        handlers.start_handlers().await;
    }
    let srv = create_server_instance(config, db, gateway, producers)?;
    srv.await?;
    Ok(())
}

pub fn create_server_instance<B, G>(
    config: ServerConfig,
    db: B,
    gateway: G,
    producers: EventProducers,
) -> Result<Server, ServerError>
where
    B: MarketplaceDatabase + Clone + Send + 'static,
    G: PaymentGateway + Clone + Send + 'static,
{
    let log_format = if config.use_x_forwarded_for {
        "%t (%D ms) %s %{r}a %{Host}i %U"
    } else {
        "%t (%D ms) %s %a %{Host}i %U"
    };
    let bind_addr = (config.host.clone(), config.port);
    let srv = HttpServer::new(move || {
        let checkout_api = CheckoutApi::new(db.clone(), gateway.clone(), producers.clone())
            .with_currency(config.currency.as_str());
        let merchant_api =
            MerchantAccountApi::new(db.clone(), gateway.clone(), producers.clone(), config.client_url.as_str());
        let webhook_api = WebhookApi::new(db.clone(), gateway.clone(), producers.clone());
        App::new()
            .wrap(Logger::new(log_format).log_target("mpg::access_log"))
            .wrap(Cors::permissive())
            .app_data(json_config())
            .app_data(web::Data::new(checkout_api))
            .app_data(web::Data::new(merchant_api))
            .app_data(web::Data::new(webhook_api))
            .service(health)
            .service(CreatePaymentIntentRoute::<B, G>::new())
            .service(ConfirmPaymentRoute::<B, G>::new())
            .service(CreateConnectedAccountRoute::<B, G>::new())
            .service(GetAccountStatusRoute::<B, G>::new())
            .service(RefreshAccountLinkRoute::<B, G>::new())
            .service(GetDashboardLinkRoute::<B, G>::new())
            .service(webhook_scope::<B, G>(&config))
    })
    .keep_alive(KeepAlive::Timeout(Duration::from_secs(600)))
    .bind((bind_addr.0.as_str(), bind_addr.1))?
    .run();
    Ok(srv)
}

/// The Stripe webhook, behind signature verification.
pub fn webhook_scope<B, G>(config: &ServerConfig) -> actix_web::Scope<
    impl actix_web::dev::ServiceFactory<
        actix_web::dev::ServiceRequest,
        Config = (),
        Response = actix_web::dev::ServiceResponse<actix_web::body::BoxBody>,
        Error = Error,
        InitError = (),
    >,
>
where
    B: MarketplaceDatabase + 'static,
    G: PaymentGateway + 'static,
{
    let signature_check = StripeSignatureMiddlewareFactory::new(
        config.stripe.webhook_secret.clone(),
        config.stripe.webhook_tolerance_secs,
    );
    web::scope("/stripe-webhook").wrap(signature_check).service(StripeWebhookRoute::<B, G>::new())
}

/// Malformed JSON bodies get the same `{"error": ...}` response as every other failure.
pub fn json_config() -> web::JsonConfig {
    web::JsonConfig::default().error_handler(|err: JsonPayloadError, _req: &HttpRequest| {
        debug!("💻️ Could not deserialize request body. {err}");
        ServerError::InvalidRequestBody(err.to_string()).into()
    })
}

fn create_event_handlers(config: &ServerConfig) -> Result<Vec<EventHandlers>, ServerError> {
    let mut result = vec![create_audit_event_handlers()];
    if let Some(email) = config.email.clone() {
        let handlers =
            create_email_event_handlers(email).map_err(|e| ServerError::InitializeError(e.to_string()))?;
        result.push(handlers);
    }
    Ok(result)
}

/// Writes orders and payouts to the log as they happen.
fn create_audit_event_handlers() -> EventHandlers {
    let mut hooks = EventHooks::default();
    hooks.on_order_created(|ev| {
        let order = ev.order;
        info!(
            "🧾 Order {} created for {} ({} items, {}) from payment {}",
            order.id,
            order.user_id,
            order.items.len(),
            order.total_amount,
            order.payment_intent_id
        );
        no_op()
    });
    hooks.on_transfer_created(|ev| {
        let t = ev.transfer;
        info!(
            "💸 Seller {} received {} for {} (platform fee {}, transfer {})",
            t.seller_id,
            t.amount,
            t.payment_intent_id,
            t.platform_fee,
            t.transfer_id.as_deref().unwrap_or("unknown")
        );
        no_op()
    });
    EventHandlers::new(AUDIT_EVENT_BUFFER_SIZE, hooks)
}

fn no_op() -> BoxFuture<'static, ()> {
    Box::pin(async {})
}
