//! HTTP surface: routing, session roles and error mapping.

use actix_session::{SessionMiddleware, storage::CookieSessionStore};
use actix_web::{App, cookie::Key, http::StatusCode, test, web};
use serde_json::{Value, json};

use agm::backend::{Backend, MemoryBackend};
use agm::handlers;

mod common;
use common::*;

macro_rules! init_app {
    ($backend:expr) => {
        test::init_service(
            App::new()
                .wrap(
                    SessionMiddleware::builder(CookieSessionStore::default(), Key::generate())
                        .cookie_secure(false)
                        .build(),
                )
                .app_data(web::Data::new($backend.clone()))
                .configure(handlers::configure::<MemoryBackend>),
        )
        .await
    };
}

/// Pick a surface and return the session cookie carrying it.
macro_rules! select_surface {
    ($app:expr, $role:expr) => {{
        let req = test::TestRequest::post()
            .uri("/surface")
            .set_json(json!({ "role": $role }))
            .to_request();
        let resp = test::call_service(&$app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        resp.response()
            .cookies()
            .next()
            .expect("session cookie")
            .into_owned()
    }};
}

#[actix_web::test]
async fn test_api_requires_a_surface() {
    let fx = setup(2).await;
    let app = init_app!(fx.backend);

    let req = test::TestRequest::get().uri("/api/members").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["kind"], "permission");
}

#[actix_web::test]
async fn test_mutations_must_be_json() {
    let fx = setup(1).await;
    let app = init_app!(fx.backend);
    let admin = select_surface!(app, "admin");

    let req = test::TestRequest::post()
        .uri("/api/meetings/deactivate")
        .cookie(admin)
        .set_payload("x=1")
        .insert_header(("content-type", "application/x-www-form-urlencoded"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn test_roster_import_and_listing() {
    let fx = setup(0).await;
    let app = init_app!(fx.backend);
    let admin = select_surface!(app, "admin");
    let desk = select_surface!(app, "desk");

    let payload = json!({ "members": [
        { "unit": "101-101", "name": "Lee", "proxy": " Park " },
        { "unit": "101-102", "name": "Choi" },
    ]});

    let req = test::TestRequest::post()
        .uri("/api/members/import")
        .cookie(desk.clone())
        .set_json(&payload)
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::FORBIDDEN);

    let req = test::TestRequest::post()
        .uri("/api/members/import")
        .cookie(admin)
        .set_json(&payload)
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["imported"], 2);

    let req = test::TestRequest::get().uri("/api/members").cookie(desk).to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    let members = body["members"].as_array().unwrap();
    assert_eq!(members.len(), 2);
    assert_eq!(members[0]["proxy"], "Park");
}

#[actix_web::test]
async fn test_desk_cannot_check_in_to_closed_meeting() {
    let fx = setup(3).await;
    let app = init_app!(fx.backend);
    let admin = select_surface!(app, "admin");
    let desk = select_surface!(app, "desk");

    let req = test::TestRequest::post()
        .uri(&format!("/api/meetings/{}/activate", fx.meeting_a))
        .cookie(admin.clone())
        .set_json(json!({}))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);

    let check_in = |member_id: i64| {
        json!({ "meeting_id": fx.meeting_a, "member_id": member_id, "type": "direct" })
    };

    let req = test::TestRequest::post()
        .uri("/api/desk/check-in")
        .cookie(desk.clone())
        .set_json(check_in(fx.members[0].id))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["record"]["meeting_id"], fx.meeting_a);

    let req = test::TestRequest::post()
        .uri(&format!("/api/meetings/{}/activate", fx.meeting_b))
        .cookie(admin)
        .set_json(json!({}))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);

    // The desk still believes meeting A is open.
    let req = test::TestRequest::post()
        .uri("/api/desk/check-in")
        .cookie(desk.clone())
        .set_json(check_in(fx.members[1].id))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["kind"], "validation");

    let records = fx.backend.list_attendance(Some(fx.meeting_a)).await.unwrap();
    assert_eq!(records.len(), 1);

    let req = test::TestRequest::get().uri("/api/desk").cookie(desk).to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["meeting_id"], fx.meeting_b);
    assert_eq!(body["stats"]["total"], 0);
}

#[actix_web::test]
async fn test_desk_cannot_cancel_in_closed_meeting() {
    let fx = setup(3).await;
    let app = init_app!(fx.backend);
    let admin = select_surface!(app, "admin");
    let desk = select_surface!(app, "desk");

    let activate = |meeting_id: i64| {
        test::TestRequest::post()
            .uri(&format!("/api/meetings/{meeting_id}/activate"))
            .cookie(admin.clone())
            .set_json(json!({}))
            .to_request()
    };
    let cancel = |member_id: i64| {
        test::TestRequest::post()
            .uri("/api/desk/cancel")
            .cookie(desk.clone())
            .set_json(json!({ "meeting_id": fx.meeting_a, "member_id": member_id }))
            .to_request()
    };

    assert_eq!(test::call_service(&app, activate(fx.meeting_a)).await.status(), StatusCode::OK);
    check_in_many(&fx, fx.meeting_a, 2, 0, 0).await;

    let resp = test::call_service(&app, cancel(fx.members[0].id)).await;
    assert_eq!(resp.status(), StatusCode::OK);

    assert_eq!(test::call_service(&app, activate(fx.meeting_b)).await.status(), StatusCode::OK);

    // A desk still showing meeting A must not touch its records.
    let resp = test::call_service(&app, cancel(fx.members[1].id)).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["kind"], "validation");

    let records = fx.backend.list_attendance(Some(fx.meeting_a)).await.unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].member_id, fx.members[1].id);
}

#[actix_web::test]
async fn test_commission_errors_are_distinct() {
    let fx = setup(2).await;
    let app = init_app!(fx.backend);
    let commission = select_surface!(app, "commission");

    let req = test::TestRequest::post()
        .uri("/api/projector/mode")
        .cookie(commission.clone())
        .set_json(json!({ "mode": "PPT", "agenda_id": fx.budget }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["kind"], "permission");

    let req = test::TestRequest::post()
        .uri("/api/projector/mode")
        .cookie(commission)
        .set_json(json!({ "mode": "RESULT", "agenda_id": fx.budget }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CONFLICT);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["kind"], "not_connected");
}

#[actix_web::test]
async fn test_vote_entry_and_confirmation() {
    let fx = setup(10).await;
    check_in_many(&fx, fx.meeting_a, 8, 1, 1).await;
    let app = init_app!(fx.backend);
    let admin = select_surface!(app, "admin");

    let req = test::TestRequest::post()
        .uri(&format!("/api/agendas/{}/votes", fx.bylaws))
        .cookie(admin.clone())
        .set_json(json!({ "field": "yes", "value": 7 }))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["tally"]["tally"]["votes"], json!({ "yes": 7, "no": 3, "abstain": 0 }));
    assert_eq!(body["tally"]["tally"]["result"], "PASSED");
    assert_eq!(body["tally"]["live_stats"]["total"], 10);

    let req = test::TestRequest::post()
        .uri(&format!("/api/agendas/{}/confirm", fx.bylaws))
        .cookie(admin.clone())
        .set_json(json!({}))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["snapshot"]["result"], "PASSED");

    // Vote fields are not editable through the structural route.
    let req = test::TestRequest::post()
        .uri(&format!("/api/agendas/{}", fx.bylaws))
        .cookie(admin)
        .set_json(json!({ "vote_snapshot": null }))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn test_agenda_insert_after_position() {
    let fx = setup(0).await;
    let app = init_app!(fx.backend);
    let admin = select_surface!(app, "admin");

    let req = test::TestRequest::post()
        .uri("/api/agendas")
        .cookie(admin.clone())
        .set_json(json!({ "type": "item", "kind": "majority", "title": "Audit report", "after_order_index": 2 }))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    let id = body["agenda"]["id"].as_i64().unwrap();
    assert_eq!(body["agenda"]["meeting_id"], fx.meeting_a);

    let req = test::TestRequest::get().uri("/api/agendas").cookie(admin).to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    let ids: Vec<i64> = body["agendas"]
        .as_array()
        .unwrap()
        .iter()
        .map(|a| a["id"].as_i64().unwrap())
        .collect();
    assert_eq!(ids, vec![fx.meeting_a, fx.budget, fx.bylaws, id, fx.meeting_b, fx.election]);
}

#[actix_web::test]
async fn test_upload_stores_bytes() {
    let fx = setup(0).await;
    let app = init_app!(fx.backend);
    let admin = select_surface!(app, "admin");

    let req = test::TestRequest::post()
        .uri("/api/files/decks/annual.pdf")
        .cookie(admin)
        .insert_header(("content-type", "application/pdf"))
        .set_payload(b"%PDF-1.7".to_vec())
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["url"], "/files/decks/annual.pdf");
    assert_eq!(fx.backend.file("decks", "annual.pdf").as_deref(), Some(&b"%PDF-1.7"[..]));
}

#[actix_web::test]
async fn test_projector_screen_defaults_to_idle() {
    let fx = setup(0).await;
    let app = init_app!(fx.backend);
    let projector = select_surface!(app, "projector");

    let req = test::TestRequest::get().uri("/api/projector/screen").cookie(projector.clone()).to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["screen"]["screen"], "idle");

    let req = test::TestRequest::get().uri("/api/projector/status").cookie(projector).to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["connected"], false);
}
