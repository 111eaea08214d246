//! WebSocket endpoint. One connection is scoped to one conversation: it
//! subscribes to the conversation broadcast + typing channels and to the
//! participant's private message/error queues, then relays inbound
//! send/typing/read events into the store and the Delivery Router.

use actix::{Actor, ActorContext, AsyncContext, StreamHandler};
use actix_web::{get, web, HttpRequest, HttpResponse};
use actix_web_actors::ws;
use serde::Deserialize;
use std::time::{Duration, Instant};
use tokio::sync::mpsc::UnboundedReceiver;
use tokio_stream::wrappers::UnboundedReceiverStream;
use tracing::{debug, warn};

use crate::error::AppError;
use crate::middleware::{guards::bearer_token, verify_jwt};
use crate::routing::channels;
use crate::routing::router::read_receipt;
use crate::routing::TypingEvent;
use crate::services::{ChatService, MessageService};
use crate::state::AppState;
use crate::websocket::message_types::WsInboundEvent;
use crate::websocket::SubscriberId;

const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(5);
const CLIENT_TIMEOUT: Duration = Duration::from_secs(30);
const PRESENCE_REFRESH: Duration = Duration::from_secs(30);

#[derive(Debug, Deserialize)]
pub struct WsParams {
    pub chat_id: String,
    pub token: Option<String>,
}

struct WsSession {
    user_id: String,
    user_name: String,
    chat_id: String,
    subscriber_id: SubscriberId,
    state: AppState,
    hb: Instant,
    // handed to the actor context in started()
    rx: Option<UnboundedReceiver<String>>,
}

impl WsSession {
    fn hb(&self, ctx: &mut ws::WebsocketContext<Self>) {
        ctx.run_interval(HEARTBEAT_INTERVAL, |act, ctx| {
            if Instant::now().duration_since(act.hb) > CLIENT_TIMEOUT {
                warn!(user_id = %act.user_id, "websocket heartbeat timed out, disconnecting");
                ctx.stop();
                return;
            }
            ctx.ping(b"");
        });
    }

    fn refresh_presence(&self, ctx: &mut ws::WebsocketContext<Self>) {
        ctx.run_interval(PRESENCE_REFRESH, |act, _ctx| {
            let presence = act.state.presence.clone();
            let user_id = act.user_id.clone();
            actix::spawn(async move {
                if let Err(e) = presence.mark_online(&user_id).await {
                    debug!(error = %e, "presence refresh failed");
                }
            });
        });
    }
}

impl Actor for WsSession {
    type Context = ws::WebsocketContext<Self>;

    fn started(&mut self, ctx: &mut Self::Context) {
        debug!(user_id = %self.user_id, chat_id = %self.chat_id, "websocket session started");

        self.hb(ctx);
        self.refresh_presence(ctx);

        // bridge registry deliveries into this socket
        if let Some(rx) = self.rx.take() {
            ctx.add_stream(UnboundedReceiverStream::new(rx));
        }

        let presence = self.state.presence.clone();
        let user_id = self.user_id.clone();
        actix::spawn(async move {
            if let Err(e) = presence.mark_online(&user_id).await {
                debug!(error = %e, "presence mark_online failed");
            }
        });
    }

    fn stopped(&mut self, _ctx: &mut Self::Context) {
        debug!(user_id = %self.user_id, chat_id = %self.chat_id, "websocket session stopped");

        let registry = self.state.registry.clone();
        let subscriber_id = self.subscriber_id;
        let presence = self.state.presence.clone();
        let user_id = self.user_id.clone();
        actix::spawn(async move {
            registry.remove_subscriber(subscriber_id).await;
            if let Err(e) = presence.mark_offline(&user_id).await {
                debug!(error = %e, "presence mark_offline failed");
            }
        });
    }
}

/// Payloads delivered through the connection registry.
impl StreamHandler<String> for WsSession {
    fn handle(&mut self, payload: String, ctx: &mut Self::Context) {
        ctx.text(payload);
    }
}

impl StreamHandler<Result<ws::Message, ws::ProtocolError>> for WsSession {
    fn handle(&mut self, msg: Result<ws::Message, ws::ProtocolError>, ctx: &mut Self::Context) {
        match msg {
            Ok(ws::Message::Ping(msg)) => {
                self.hb = Instant::now();
                ctx.pong(&msg);
            }
            Ok(ws::Message::Pong(_)) => {
                self.hb = Instant::now();
            }
            Ok(ws::Message::Text(text)) => match serde_json::from_str::<WsInboundEvent>(&text) {
                Ok(event) => {
                    let state = self.state.clone();
                    let user_id = self.user_id.clone();
                    let user_name = self.user_name.clone();
                    let chat_id = self.chat_id.clone();
                    let subscriber_id = self.subscriber_id;
                    actix::spawn(async move {
                        handle_event(state, user_id, user_name, chat_id, subscriber_id, event)
                            .await;
                    });
                }
                Err(e) => {
                    warn!(error = %e, "unparseable websocket event dropped");
                }
            },
            Ok(ws::Message::Binary(_)) => {
                warn!("binary websocket messages not supported");
            }
            Ok(ws::Message::Close(reason)) => {
                debug!(?reason, "websocket close received");
                ctx.stop();
            }
            _ => {}
        }
    }
}

async fn handle_event(
    state: AppState,
    user_id: String,
    user_name: String,
    chat_id: String,
    subscriber_id: SubscriberId,
    event: WsInboundEvent,
) {
    match event {
        WsInboundEvent::Send { draft } => {
            // Persistence is the durability boundary: on failure nothing is
            // routed except the error to the sender's own error queue.
            match MessageService::append(&state.db, &draft, &user_id).await {
                Ok(message) => {
                    state.router.route_message(&message).await;
                }
                Err(e) => {
                    warn!(error = %e, user_id = %user_id, "send over websocket failed");
                    state.router.route_send_failure(&user_id, &e).await;
                }
            }
        }

        WsInboundEvent::Typing {
            chat_id: event_chat_id,
            is_typing,
        } => {
            // only for the conversation this connection is scoped to
            if event_chat_id != chat_id {
                return;
            }
            state
                .router
                .route_typing(&TypingEvent {
                    conversation_id: event_chat_id,
                    actor_id: user_id,
                    actor_name: user_name,
                    is_typing,
                })
                .await;
        }

        WsInboundEvent::MarkRead { message_id } => {
            match MessageService::mark_read(&state.db, message_id, &user_id).await {
                Ok(Some(_)) => {
                    state
                        .router
                        .route_read_receipt(&read_receipt(message_id, &user_id))
                        .await;
                }
                // authorization mismatch: deliberately silent
                Ok(None) => {}
                Err(e) => {
                    debug!(error = %e, message_id = %message_id, "mark_read over websocket failed");
                }
            }
        }

        WsInboundEvent::SubscribeReceipts { message_id } => {
            state
                .registry
                .add_channel(&channels::read_receipt_channel(message_id), subscriber_id)
                .await;
        }
    }
}

/// GET /ws?chat_id=..&token=..
#[get("/ws")]
pub async fn ws_handler(
    req: HttpRequest,
    stream: web::Payload,
    state: web::Data<AppState>,
    query: web::Query<WsParams>,
) -> Result<HttpResponse, actix_web::Error> {
    let params = query.into_inner();

    let token = params
        .token
        .clone()
        .or_else(|| bearer_token(&req))
        .ok_or(AppError::Unauthorized)?;
    let claims = verify_jwt(&token)?;

    let chat = ChatService::get(&state.db, &params.chat_id).await?;
    if !chat.is_participant(&claims.sub) {
        return Err(AppError::Unauthorized.into());
    }

    let subscriptions = vec![
        channels::chat_channel(&params.chat_id),
        channels::typing_channel(&params.chat_id),
        channels::user_message_queue(&claims.sub),
        channels::user_error_queue(&claims.sub),
    ];
    let (subscriber_id, rx) = state.registry.add_subscriber(&subscriptions).await;

    let session = WsSession {
        user_id: claims.sub,
        user_name: claims.name,
        chat_id: params.chat_id,
        subscriber_id,
        state: state.as_ref().clone(),
        hb: Instant::now(),
        rx: Some(rx),
    };

    ws::start(session, &req, stream)
}
