use actix_web::{web, App, HttpResponse, HttpServer};
use std::sync::Arc;
use utoipa::OpenApi;

use chat_delivery_service::{
    config, db, error, logging,
    middleware::init_jwt,
    openapi::ApiDoc,
    redis_client::RedisClient,
    routes,
    routing::{DeliveryRouter, RedisTransport},
    services::{MediaStorage, PresenceService, S3MediaStorage},
    state::AppState,
    websocket::{listener::start_pubsub_listener, ConnectionRegistry},
};

#[tokio::main]
async fn main() -> Result<(), error::AppError> {
    logging::init_tracing();
    let cfg = Arc::new(config::Config::from_env()?);
    init_jwt(&cfg.jwt_secret)?;

    let db = db::init_pool(&cfg.database_url)
        .await
        .map_err(|e| error::AppError::StartServer(format!("db: {e}")))?;
    db::run_migrations(&db).await?;

    let redis = RedisClient::from_url(&cfg.redis_url)
        .await
        .map_err(|e| error::AppError::StartServer(format!("redis: {e}")))?;

    let registry = ConnectionRegistry::new();
    let router = DeliveryRouter::new(Arc::new(RedisTransport::new(redis.clone())));
    let presence = PresenceService::new(redis.clone(), router.clone(), cfg.presence_ttl_secs);
    let media: Arc<dyn MediaStorage> = Arc::new(S3MediaStorage::from_config(&cfg.s3).await);

    // Cross-instance fan-out: everything the router publishes to Redis comes
    // back through this listener into the local registry.
    tokio::spawn(start_pubsub_listener(redis.clone(), registry.clone()));

    let state = AppState {
        db,
        redis,
        registry,
        router,
        presence,
        media,
        config: cfg.clone(),
    };

    let bind_addr = format!("0.0.0.0:{}", cfg.port);
    tracing::info!(%bind_addr, "starting chat-delivery-service");

    HttpServer::new(move || {
        let cors = actix_cors::Cors::default()
            .allow_any_origin()
            .allow_any_method()
            .allow_any_header()
            .max_age(3600);

        App::new()
            .wrap(cors)
            .app_data(web::Data::new(state.clone()))
            .app_data(web::PayloadConfig::new(26 * 1024 * 1024))
            .service(routes::chats::create_direct_chat)
            .service(routes::chats::list_chats)
            .service(routes::groups::create_group)
            .service(routes::groups::update_group)
            .service(routes::groups::add_member)
            .service(routes::groups::remove_member)
            .service(routes::groups::delete_group)
            .service(routes::messages::send_message)
            .service(routes::messages::search_messages)
            .service(routes::messages::get_messages)
            .service(routes::messages::edit_message)
            .service(routes::messages::delete_message)
            .service(routes::messages::react_to_message)
            .service(routes::messages::toggle_pin)
            .service(routes::messages::mark_read)
            .service(routes::uploads::upload_file)
            .service(routes::presence::get_presence)
            .service(routes::wsroute::ws_handler)
            .route(
                "/openapi.json",
                web::get().to(|| async { HttpResponse::Ok().json(ApiDoc::openapi()) }),
            )
            .route("/health", web::get().to(|| async { "OK" }))
    })
    .bind(&bind_addr)
    .map_err(|e| error::AppError::StartServer(format!("bind: {e}")))?
    .run()
    .await
    .map_err(|e| error::AppError::StartServer(format!("run server: {e}")))
}
