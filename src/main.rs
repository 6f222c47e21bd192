use std::env;

use actix::{Addr, SyncArbiter};
use actix_web::web::Data;
use actix_web::{web, App, HttpServer};
use dotenv::dotenv;
use tracing::info;
use tracing_subscriber::EnvFilter;

use services::db_utils::{get_db_pool, AppState, PgActor};

mod schema;
mod services;
mod types;

fn init_pg_db() -> Addr<PgActor> {
    let db_url = env::var("PG_DATABASE_URL").expect("PG_DATABASE_URL must be set");
    let pool = get_db_pool(&db_url).expect("failed to build postgres pool");

    SyncArbiter::start(5, move || PgActor(pool.clone()))
}

fn init_redis_db() -> redis::Client {
    let db_uri = env::var("REDIS_DATABASE_URI").expect("REDIS_DATABASE_URI must be set");

    redis::Client::open(db_uri).expect("failed to open redis client")
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    dotenv().ok();
    let pg_db = init_pg_db();
    let redis_db = init_redis_db();

    let bind_addr = env::var("BIND_ADDR").unwrap_or_else(|_| "127.0.0.1:8080".to_owned());
    info!(%bind_addr, "starting woodlands ordering backend");

    HttpServer::new(move || {
        App::new()
            .app_data(Data::new(AppState { pg_db: pg_db.clone(), redis_db: redis_db.clone() }))
            .service(services::home_page)
            .service(
                web::scope("/orders")
                    .service(services::order_route::create_order)
                    .service(services::order_route::list_orders)
                    .service(services::order_route::order_board)
                    .service(services::order_route::get_order)
                    .service(services::order_route::update_status)
            )
            .service(
                web::scope("/menu")
                    .service(services::menu_route::view_menu)
            )
            .service(
                web::scope("/reports")
                    .service(services::report_route::end_of_day)
            )
    })
        .bind(bind_addr)?
        .run()
        .await
}
