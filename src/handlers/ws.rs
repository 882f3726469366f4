use actix_session::Session;
use actix_web::{HttpRequest, HttpResponse, web};
use actix_ws::Message;
use serde::Deserialize;
use std::time::Instant;

use crate::backend::Backend;
use crate::bus::{Bus, events, generate_presence_key};

use super::session::get_role;

/// Frames a browser may send. Everything else travels over HTTP.
#[derive(Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
enum ClientFrame {
    Heartbeat,
}

fn announce_presence(bus: &Bus, channel: &str) {
    let members = bus.presence().members(channel, Instant::now());
    bus.publish(channel, events::PRESENCE, serde_json::json!({ "members": members }));
}

/// WebSocket bridge onto the bus.
///
/// Forwards every message on `channel` to the browser and tracks the
/// connection in the channel's presence set until it closes.
pub async fn ws_connect<B: Backend>(
    req: HttpRequest,
    body: web::Payload,
    session: Session,
    backend: web::Data<B>,
    path: web::Path<String>,
) -> Result<HttpResponse, actix_web::Error> {
    let role = match get_role(&session) {
        Some(role) => role,
        None => return Ok(HttpResponse::Unauthorized().finish()),
    };
    let channel = path.into_inner();

    let (response, mut ws_session, mut msg_stream) = actix_ws::handle(&req, body)?;

    let bus = backend.bus().clone();
    let mut rx = bus.subscribe(&channel);
    let key = generate_presence_key();
    bus.presence().join(&channel, &key, role.as_str(), Instant::now());
    log::info!("{role} surface joined channel '{channel}'");
    announce_presence(&bus, &channel);

    actix_web::rt::spawn(async move {
        loop {
            tokio::select! {
                Some(msg) = rx.recv() => {
                    let text = match serde_json::to_string(&msg) {
                        Ok(t) => t,
                        Err(_) => continue,
                    };
                    if ws_session.text(text).await.is_err() {
                        break;
                    }
                }
                Some(Ok(msg)) = msg_stream.recv() => {
                    match msg {
                        Message::Ping(bytes) => {
                            if ws_session.pong(&bytes).await.is_err() {
                                break;
                            }
                        }
                        Message::Close(_) => break,
                        Message::Text(text) => match serde_json::from_str::<ClientFrame>(&text) {
                            Ok(ClientFrame::Heartbeat) => {
                                let now = Instant::now();
                                if !bus.presence().heartbeat(&channel, &key, now) {
                                    // Left already; register again.
                                    bus.presence().join(&channel, &key, role.as_str(), now);
                                    announce_presence(&bus, &channel);
                                }
                            }
                            Err(e) => log::debug!("Ignoring frame on '{channel}': {e}"),
                        },
                        _ => {}
                    }
                }
                else => break,
            }
        }

        bus.presence().leave(&channel, &key);
        log::info!("{role} surface left channel '{channel}'");
        announce_presence(&bus, &channel);
        let _ = ws_session.close(None).await;
    });

    Ok(response)
}
