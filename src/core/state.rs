//! Application State - shared by every route and middleware.

use crate::core::{Config, auth::SessionKeys};
use crate::realtime::{RealtimeHub, RelayClient};
use crate::repositories::{
    AppointmentRepository, CategoryRepository, EmployeeRepository, NotificationRepository,
    OrderRepository, PaymentRepository, ProductRepository, ReviewRepository, ServiceRepository,
    UserRepository, VehicleRepository,
};
use sqlx::MySqlPool;

pub struct AppState {
    pub user: UserRepository,
    pub category: CategoryRepository,
    pub service: ServiceRepository,
    pub vehicle: VehicleRepository,
    pub employee: EmployeeRepository,
    pub appointment: AppointmentRepository,
    pub product: ProductRepository,
    pub order: OrderRepository,
    pub payment: PaymentRepository,
    pub notification: NotificationRepository,
    pub review: ReviewRepository,

    pub config: Config,

    /// Verification keys for identity-provider session tokens
    pub session_keys: SessionKeys,

    /// In-process pub/sub, fanned out to WebSocket clients
    pub hub: RealtimeHub,

    /// Optional forwarder to the hosted pub/sub service
    pub relay: Option<RelayClient>,

    /// Outbound HTTP client (payment gateway status checks)
    pub http: reqwest::Client,
}

impl AppState {
    /// Builds every repository over the shared pool.
    ///
    /// Fails when the session token key in `config` cannot be parsed.
    pub fn new(pool: MySqlPool, config: Config) -> Result<Self, String> {
        let session_keys = SessionKeys::from_config(&config)?;
        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(10))
            .build()
            .map_err(|e| format!("Failed to build HTTP client: {}", e))?;
        let relay = RelayClient::from_config(&config, http.clone());

        Ok(Self {
            user: UserRepository::new(pool.clone()),
            category: CategoryRepository::new(pool.clone()),
            service: ServiceRepository::new(pool.clone()),
            vehicle: VehicleRepository::new(pool.clone()),
            employee: EmployeeRepository::new(pool.clone()),
            appointment: AppointmentRepository::new(pool.clone()),
            product: ProductRepository::new(pool.clone()),
            order: OrderRepository::new(pool.clone()),
            payment: PaymentRepository::new(pool.clone()),
            notification: NotificationRepository::new(pool.clone()),
            review: ReviewRepository::new(pool),
            config,
            session_keys,
            hub: RealtimeHub::new(),
            relay,
            http,
        })
    }
}
