use rocket::Route;

mod admin;
mod auth;
mod results;
mod voting;

pub fn routes() -> Vec<Route> {
    let mut routes = Vec::new();
    routes.extend(auth::routes());
    routes.extend(voting::routes());
    routes.extend(admin::routes());
    routes.extend(results::routes());
    routes
}
