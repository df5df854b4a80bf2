#[macro_use]
extern crate rocket;

#[cfg(test)]
#[macro_use]
extern crate backend_test;

pub mod api;
pub mod error;
pub mod logging;
pub mod model;
pub mod scheduled_task;

mod config;
pub use config::Config;
pub use model::db::voting_event::ElectionClosers;

use rocket::{Build, Rocket};

use crate::config::{ConfigFairing, DatabaseFairing};
use crate::logging::LoggerFairing;
use crate::model::db::voting_event::ElectionCloserFairing;

/// Assemble the server. Fairings are attached in dependency order:
/// the election closers need the database, which needs the config.
pub fn build() -> Rocket<Build> {
    rocket::build()
        .mount("/", api::routes())
        .attach(LoggerFairing)
        .attach(ConfigFairing)
        .attach(DatabaseFairing)
        .attach(ElectionCloserFairing)
}

/// Get a database client for tests, using the same `db_uri` config the server uses.
#[cfg(test)]
pub(crate) async fn db_client() -> mongodb::Client {
    let db_uri = rocket::build()
        .figment()
        .extract_inner::<String>("db_uri")
        .expect("`db_uri` not set");
    mongodb::Client::with_uri_str(&db_uri)
        .await
        .expect("Could not connect to database")
}

/// Get a random database name, so concurrent tests cannot collide.
#[cfg(test)]
pub(crate) fn database() -> String {
    let random: u32 = rand::random();
    format!("test{random}")
}

/// Build a rocket against the given client and database name, bypassing the
/// usual config-driven database fairing. Used by the `backend_test` macro.
#[cfg(test)]
pub(crate) async fn rocket_for_db(client: mongodb::Client, db_name: &str) -> Rocket<Build> {
    use crate::model::db::voting_event::ElectionClosers;
    use crate::model::mongodb::ensure_indexes_exist;

    let db = client.database(db_name);
    ensure_indexes_exist(&db)
        .await
        .expect("Failed to create indexes");

    let rocket = rocket::build().mount("/", api::routes());
    let config = rocket
        .figment()
        .extract::<Config>()
        .expect("Failed to load test config");

    rocket
        .manage(config)
        .manage(client)
        .manage(db)
        .manage(ElectionClosers::new())
}
