use deadpool_postgres::Pool;
use std::sync::Arc;

use crate::{
    config::Config,
    redis_client::RedisClient,
    routing::DeliveryRouter,
    services::{MediaStorage, PresenceService},
    websocket::ConnectionRegistry,
};

#[derive(Clone)]
pub struct AppState {
    pub db: Pool,
    pub redis: RedisClient,
    pub registry: ConnectionRegistry,
    pub router: DeliveryRouter,
    pub presence: PresenceService,
    pub media: Arc<dyn MediaStorage>,
    pub config: Arc<Config>,
}
