//! Main entry point for the campground kiosk server.
//! Wires the booking core to Postgres, Stripe and AWS, exposes the kiosk API
//! and serves the frontend build.

use std::path::Path;
use std::sync::Arc;

use actix_files::Files;
use actix_web::{App, HttpResponse, HttpServer, middleware::Logger, web};
use anyhow::Context;
use campground::{
    BookingCoordinator, GuestNotifier, Inventory, KioskConfig, PaymentGateway, ReservationDesk,
    ReservationStore, VerificationCodes, WalkUpDesk,
};
use notification_services::{LogNotifier, NotificationService, NotificationSettings};
use payment_services::{MockPaymentGateway, StripeConfig, StripeGateway};
use postgres::*;
use web_handlers::{SessionStore, configure_api};

fn get_frontend_path() -> &'static str {
    // Check multiple possible locations for frontend files
    if Path::new("./frontend-build").exists() {
        log::info!("✅ Using Docker frontend path: ./frontend-build");
        "./frontend-build"
    } else if Path::new("../frontend/build").exists() {
        log::info!("✅ Using local frontend path: ../frontend/build");
        "../frontend/build"
    } else {
        log::info!("❌ Frontend files not found in either location");
        "./frontend-build" // fallback
    }
}

async fn load_kiosk_inventory(pool: &PgPool) -> anyhow::Result<Inventory> {
    match std::env::var("INVENTORY_FILE") {
        Ok(path) => {
            let json = std::fs::read_to_string(&path)
                .with_context(|| format!("reading inventory file {}", path))?;
            let inventory = Inventory::from_json(&json)
                .with_context(|| format!("parsing inventory file {}", path))?;
            log::info!("🏕️ Inventory loaded from {}", path);
            Ok(inventory)
        }
        Err(_) => load_inventory(pool)
            .await
            .context("loading inventory from the database"),
    }
}

fn payment_gateway() -> anyhow::Result<Arc<dyn PaymentGateway>> {
    match StripeConfig::from_env() {
        Some(config) => Ok(Arc::new(
            StripeGateway::new(config).context("creating the Stripe client")?,
        )),
        None => {
            log::warn!("⚠️ STRIPE_SECRET_KEY not set, using the mock payment gateway");
            Ok(Arc::new(MockPaymentGateway::new()))
        }
    }
}

async fn guest_notifier(config: &KioskConfig) -> Arc<dyn GuestNotifier> {
    let settings = NotificationSettings::from_env(config.verification_code_ttl_minutes);
    match std::env::var("NOTIFICATION_BACKEND").as_deref() {
        Ok("log") => {
            log::warn!("⚠️ Guest notifications are only logged");
            Arc::new(LogNotifier::new(settings))
        }
        _ => {
            log::info!("📧 Guest notifications via AWS SES/SNS");
            Arc::new(NotificationService::new(settings).await)
        }
    }
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize logger
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    log::info!("🚀 Starting campground kiosk server...");

    let config = KioskConfig::from_env().context("reading kiosk configuration")?;

    // Create database connection pool
    let pool = create_connection_pool(&DatabaseSettings::from_env())
        .await
        .context("connecting to the database (is DATABASE_URL right?)")?;
    test_connection(&pool)
        .await
        .context("database connection test")?;
    run_migrations(&pool)
        .await
        .context("applying database migrations")?;

    let inventory = Arc::new(load_kiosk_inventory(&pool).await?);
    let store: Arc<dyn ReservationStore> = Arc::new(PgReservationStore::new(pool.clone()));
    let payments = payment_gateway()?;
    let notifier = guest_notifier(&config).await;
    let codes = Arc::new(VerificationCodes::from_config(&config));

    let coordinator = web::Data::new(BookingCoordinator::new(
        inventory.clone(),
        store.clone(),
        payments.clone(),
        notifier.clone(),
        config.clone(),
    ));
    let desk = web::Data::new(ReservationDesk::new(
        inventory.clone(),
        store,
        payments.clone(),
        notifier,
        codes,
        config.clone(),
    ));
    let walk_up = web::Data::new(WalkUpDesk::new(inventory, payments, config));
    let booking_sessions = web::Data::new(SessionStore::<campground::BookingSession>::default());
    let desk_sessions = web::Data::new(SessionStore::<campground::LookupSession>::default());

    let frontend_path = get_frontend_path();
    let bind_address =
        std::env::var("BIND_ADDRESS").unwrap_or_else(|_| "0.0.0.0:8080".to_string());
    log::info!("📁 Frontend files location: {}", frontend_path);
    log::info!("🌐 Server will be available at: http://{}", bind_address);

    HttpServer::new(move || {
        App::new()
            .app_data(coordinator.clone())
            .app_data(desk.clone())
            .app_data(walk_up.clone())
            .app_data(booking_sessions.clone())
            .app_data(desk_sessions.clone())
            .wrap(Logger::default())
            .configure(configure_api)
            .route(
                "/health",
                web::get().to(|| async { HttpResponse::Ok().body("OK") }),
            )
            .service(Files::new("/", frontend_path).index_file("index.html"))
    })
    .bind(&bind_address)
    .with_context(|| format!("binding {}", bind_address))?
    .run()
    .await
    .context("running the HTTP server")
}
