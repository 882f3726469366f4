use actix_session::{SessionMiddleware, storage::CookieSessionStore};
use actix_web::{App, HttpServer, cookie::Key, middleware, web};

use agm::backend::PgBackend;
use agm::bus::Bus;
use agm::config::Config;
use agm::models::storage::FileStore;
use agm::{db, handlers};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenvy::dotenv().ok();
    env_logger::init();

    let config = Config::from_env().map_err(std::io::Error::other)?;

    std::fs::create_dir_all(&config.upload_dir)?;

    let pool = db::init_pool(&config.database_url)
        .await
        .map_err(std::io::Error::other)?;
    db::run_migrations(&pool).await.map_err(std::io::Error::other)?;

    let bus = Bus::new(config.presence_ttl);
    let files = FileStore::new(&config.upload_dir, &config.public_base_url);
    let backend = PgBackend::new(pool, bus, files);

    let secret_key = match &config.session_key {
        Some(key) => Key::from(key.as_bytes()),
        None => Key::generate(),
    };

    let upload_dir = config.upload_dir.clone();
    log::info!("Starting server at http://{}", config.bind_addr);

    HttpServer::new(move || {
        let session_mw = SessionMiddleware::builder(CookieSessionStore::default(), secret_key.clone())
            .cookie_secure(false)
            .cookie_http_only(true)
            .build();

        App::new()
            .wrap(session_mw)
            .wrap(middleware::Logger::default())
            .app_data(web::Data::new(backend.clone()))
            .service(actix_files::Files::new("/files", upload_dir.clone()))
            .configure(handlers::configure::<PgBackend>)
    })
    .bind(&config.bind_addr)?
    .run()
    .await
}
