use actix::{Actor, Addr, SyncContext};
use diesel::r2d2::{ConnectionManager, Pool, PooledConnection};
use diesel::PgConnection;

use crate::types::OrderError;

pub struct PgActor(pub Pool<ConnectionManager<PgConnection>>);

pub struct AppState {
    pub pg_db: Addr<PgActor>,
    pub redis_db: redis::Client,
}

impl Actor for PgActor {
    type Context = SyncContext<Self>;
}

impl PgActor {
    pub fn connection(&self) -> Result<PooledConnection<ConnectionManager<PgConnection>>, OrderError> {
        self.0.get().map_err(|err| OrderError::Pool(err.to_string()))
    }
}

pub fn get_db_pool(db_url: &str) -> Result<Pool<ConnectionManager<PgConnection>>, OrderError> {
    let manager: ConnectionManager<PgConnection> = ConnectionManager::<PgConnection>::new(db_url);
    Pool::builder()
        .build(manager)
        .map_err(|err| OrderError::Pool(err.to_string()))
}
