//! Shared application state and service wiring.

use std::sync::Arc;

use domain::identity::{self, IdentityService, InMemoryUserStore};
use domain::notification::{
    EmailChannel, InAppChannel, InMemoryInAppStore, LogMailer, LogSmsGateway,
    NotificationDispatcher, SmsChannel, SubscriptionPaidNotifier, VendorActivatedNotifier,
};
use domain::payment::{
    self, FlutterwaveConfig, FlutterwaveProvider, InMemoryTransactionStore, PaymentError,
    PaymentGateway, PaymentProvider, PaystackConfig, PaystackProvider, ProviderRegistry,
};
use domain::subscription::{self, InMemorySubscriptionStore, SubscriptionService};
use domain::vendor::{self, InMemoryVendorStore, VendorDirectory};
use event_bus::{BusError, EventBus, EventHandler, RetryPolicy, Retrying, Topic};
use saga::{RegistrationSaga, SagaSettings};
use saga_log::SagaLog;

use crate::config::Config;

pub type Identity = IdentityService<InMemoryUserStore>;
pub type Vendors = VendorDirectory<InMemoryVendorStore>;
pub type Subscriptions = SubscriptionService<InMemorySubscriptionStore>;
pub type Payments = PaymentGateway<InMemoryTransactionStore>;
pub type Registrations = RegistrationSaga<dyn SagaLog>;

/// Shared application state accessible from all handlers.
pub struct AppState {
    pub identity: Arc<Identity>,
    pub vendors: Arc<Vendors>,
    pub subscriptions: Arc<Subscriptions>,
    pub payments: Arc<Payments>,
    pub registrations: Arc<Registrations>,
    pub notifications: Arc<NotificationDispatcher>,
    pub bus: Arc<dyn EventBus>,
    /// Base of the links sent to users, without a trailing slash.
    pub public_url: String,
}

impl AppState {
    /// Builds every service over in-memory stores. The saga log is supplied
    /// so production can keep it in PostgreSQL.
    pub fn new(
        config: &Config,
        bus: Arc<dyn EventBus>,
        providers: Arc<ProviderRegistry>,
        saga_log: Arc<dyn SagaLog>,
        notifications: Arc<NotificationDispatcher>,
    ) -> Self {
        let identity = Arc::new(IdentityService::new(InMemoryUserStore::new()));
        let vendors = Arc::new(VendorDirectory::new(InMemoryVendorStore::new()));
        let subscriptions = Arc::new(SubscriptionService::new(
            InMemorySubscriptionStore::new(),
            bus.clone(),
        ));

        let mut gateway =
            PaymentGateway::new(InMemoryTransactionStore::new(), providers, bus.clone())
                .with_provider_sniffing(config.allow_provider_sniffing);
        if let Some(url) = &config.payment_callback_url {
            gateway = gateway.with_callback_url(url.clone());
        }
        let payments = Arc::new(gateway);

        let registrations = Arc::new(
            RegistrationSaga::new(
                saga_log,
                identity.clone(),
                vendors.clone(),
                subscriptions.clone(),
                payments.clone(),
            )
            .with_settings(SagaSettings {
                deadline: config.registration_deadline,
                step_timeout: config.step_timeout,
                compensation_timeout: config.step_timeout,
            }),
        );

        Self {
            identity,
            vendors,
            subscriptions,
            payments,
            registrations,
            notifications,
            bus,
            public_url: config.public_url.clone(),
        }
    }

    /// Registers every consumer group on the bus. Called once at startup.
    pub async fn subscribe_consumers(&self) -> Result<(), BusError> {
        let consumers: Vec<(Topic, &str, Arc<dyn EventHandler>)> = vec![
            (
                Topic::Payment,
                "subscription",
                retrying(subscription::PaymentCompletedHandler::new(
                    self.subscriptions.clone(),
                    self.bus.clone(),
                )),
            ),
            (
                Topic::Subscription,
                "vendor",
                retrying(vendor::SubscriptionPaidHandler::new(
                    self.vendors.clone(),
                    self.bus.clone(),
                )),
            ),
            (
                Topic::Subscription,
                "notification",
                retrying(SubscriptionPaidNotifier::new(
                    self.notifications.clone(),
                    self.vendors.clone(),
                )),
            ),
            (
                Topic::Vendor,
                "auth",
                retrying(identity::VendorActivatedHandler::new(self.identity.clone())),
            ),
            (
                Topic::Vendor,
                "notification",
                retrying(VendorActivatedNotifier::new(self.notifications.clone())),
            ),
            (
                Topic::Order,
                "subscription",
                retrying(subscription::OrderPlacedHandler::new(self.subscriptions.clone())),
            ),
            (
                Topic::Order,
                "payment",
                retrying(payment::OrderPlacedHandler::new(self.payments.clone())),
            ),
        ];

        for (topic, group, handler) in consumers {
            self.bus.subscribe(topic, group, handler).await?;
            tracing::debug!(%topic, group, "consumer registered");
        }
        Ok(())
    }
}

fn retrying<H: EventHandler + 'static>(handler: H) -> Arc<dyn EventHandler> {
    Arc::new(Retrying::new(handler, RetryPolicy::default()))
}

/// Builds the provider registry from whichever providers are configured.
pub fn provider_registry(config: &Config) -> Result<ProviderRegistry, PaymentError> {
    let mut providers: Vec<Arc<dyn PaymentProvider>> = Vec::new();

    if let Some(secret) = &config.paystack_secret_key {
        let mut paystack = PaystackConfig::new(secret.clone());
        if let Some(url) = &config.paystack_base_url {
            paystack = paystack.with_base_url(url.clone());
        }
        providers.push(Arc::new(PaystackProvider::new(paystack)));
    }

    match (&config.flutterwave_secret_key, &config.flutterwave_secret_hash) {
        (Some(key), Some(hash)) => {
            let mut flutterwave = FlutterwaveConfig::new(key.clone(), hash.clone());
            if let Some(url) = &config.flutterwave_base_url {
                flutterwave = flutterwave.with_base_url(url.clone());
            }
            providers.push(Arc::new(FlutterwaveProvider::new(flutterwave)));
        }
        (Some(_), None) | (None, Some(_)) => {
            return Err(PaymentError::Registry(
                "flutterwave needs both FLUTTERWAVE_SECRET_KEY and FLUTTERWAVE_SECRET_HASH"
                    .to_string(),
            ));
        }
        (None, None) => {}
    }

    let mut builder = ProviderRegistry::builder();
    for provider in providers {
        builder = builder.register(provider);
    }
    if let Some(name) = &config.default_payment_provider {
        builder = builder.default_provider(name);
    }
    builder.build()
}

/// Dispatcher over the logging mailer and SMS gateway plus the in-app store.
pub fn default_dispatcher() -> NotificationDispatcher {
    NotificationDispatcher::new(vec![
        Arc::new(EmailChannel::new(Arc::new(LogMailer))),
        Arc::new(SmsChannel::new(Arc::new(LogSmsGateway))),
        Arc::new(InAppChannel::new(Arc::new(InMemoryInAppStore::new()))),
    ])
}
