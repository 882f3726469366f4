pub mod agenda_handlers;
pub mod desk_handlers;
pub mod file_handlers;
pub mod member_handlers;
pub mod projector_handlers;
pub mod session;
pub mod surface_handlers;
pub mod tally_handlers;
pub mod ws;

use actix_web::{
    Error, HttpResponse,
    body::MessageBody,
    dev::{ServiceRequest, ServiceResponse},
    middleware::Next,
    web,
};

use crate::backend::Backend;

/// Rejects POST/PUT/DELETE requests that are not `application/json`.
///
/// Browsers cannot send cross-origin JSON with cookies via a plain form post,
/// so this doubles as the CSRF guard for the API.
async fn require_json_content_type(
    req: ServiceRequest,
    next: Next<impl MessageBody + 'static>,
) -> Result<ServiceResponse<impl MessageBody>, Error> {
    let method = req.method().clone();

    if method == actix_web::http::Method::POST
        || method == actix_web::http::Method::PUT
        || method == actix_web::http::Method::DELETE
    {
        let content_type = req
            .headers()
            .get("content-type")
            .and_then(|v| v.to_str().ok())
            .unwrap_or("");

        if !content_type.starts_with("application/json") {
            let body = serde_json::json!({
                "ok": false,
                "kind": "validation",
                "error": "Content-Type must be application/json for mutation requests"
            });
            let response = HttpResponse::BadRequest().json(body);
            return Ok(req.into_response(response).map_into_right_body());
        }
    }

    next.call(req).await.map(|res| res.map_into_left_body())
}

/// Register every route against backend `B`, which must be in app data.
pub fn configure<B: Backend>(cfg: &mut web::ServiceConfig) {
    cfg.route("/surface", web::get().to(surface_handlers::current))
        .route("/surface", web::post().to(surface_handlers::select))
        .route("/ws/{channel}", web::get().to(ws::ws_connect::<B>))
        // Uploads carry raw bytes, so they sit outside the JSON-only scope.
        .service(
            web::resource("/api/files/{bucket}/{path:.*}")
                .app_data(web::PayloadConfig::new(file_handlers::MAX_UPLOAD_BYTES))
                .route(web::post().to(file_handlers::upload::<B>)),
        );

    cfg.service(
        web::scope("/api")
            .wrap(actix_web::middleware::from_fn(require_json_content_type))
            // Roster
            .route("/members", web::get().to(member_handlers::list::<B>))
            .route("/members/import", web::post().to(member_handlers::import::<B>))
            .route("/members/{id}/proxy", web::post().to(member_handlers::set_proxy::<B>))
            // Check-in desk
            .route("/desk", web::get().to(desk_handlers::overview::<B>))
            .route("/desk/check-in", web::post().to(desk_handlers::check_in::<B>))
            .route("/desk/cancel", web::post().to(desk_handlers::cancel::<B>))
            // Agenda list and meetings
            .route("/agendas", web::get().to(agenda_handlers::list::<B>))
            .route("/agendas", web::post().to(agenda_handlers::create::<B>))
            .route("/agendas/{id}", web::post().to(agenda_handlers::update::<B>))
            .route("/agendas/{id}", web::delete().to(agenda_handlers::delete::<B>))
            .route("/meetings/{id}/activate", web::post().to(agenda_handlers::activate::<B>))
            .route("/meetings/deactivate", web::post().to(agenda_handlers::deactivate::<B>))
            // Tallies
            .route("/agendas/{id}/tally", web::get().to(tally_handlers::show::<B>))
            .route("/agendas/{id}/votes", web::post().to(tally_handlers::edit_vote::<B>))
            .route("/agendas/{id}/seed-written", web::post().to(tally_handlers::seed_written::<B>))
            .route("/agendas/{id}/declaration", web::post().to(tally_handlers::declaration::<B>))
            .route("/agendas/{id}/confirm", web::post().to(tally_handlers::confirm::<B>))
            .route("/agendas/{id}/reset", web::post().to(tally_handlers::reset::<B>))
            // Projector
            .route("/projector/mode", web::post().to(projector_handlers::set_mode::<B>))
            .route("/projector/close", web::post().to(projector_handlers::close::<B>))
            .route("/projector/screen", web::get().to(projector_handlers::screen::<B>))
            .route("/projector/status", web::get().to(projector_handlers::status::<B>)),
    );
}
