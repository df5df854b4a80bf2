use mongodb::bson::doc;
use rocket::{
    http::{Cookie, CookieJar, Status},
    serde::json::Json,
    Route,
    State,
};

use crate::{
    error::{Error, Result},
    model::{
        api::{admin::AdminCredentials, member::MemberCredentials},
        auth::{AuthToken, AUTH_TOKEN_COOKIE},
        db::{
            admin::Admin,
            member::{Member, NewMember},
        },
        mongodb::{is_duplicate_key_error, Coll},
    },
    Config,
};

pub fn routes() -> Vec<Route> {
    routes![authenticate_admin, register_member, authenticate_member, logout]
}

#[post("/auth/admin", data = "<credentials>", format = "json")]
async fn authenticate_admin(
    cookies: &CookieJar<'_>,
    credentials: Json<AdminCredentials>,
    admins: Coll<Admin>,
    config: &State<Config>,
) -> Result<()> {
    let with_username = doc! {
        "username": &credentials.username,
    };

    let admin = admins
        .find_one(with_username, None)
        .await?
        .filter(|admin| admin.verify_password(&credentials.password))
        .ok_or_else(|| {
            Error::Status(
                Status::Unauthorized,
                "No admin found with the provided username and password combination.".to_string(),
            )
        })?;

    let token = AuthToken::new(&admin);
    cookies.add(token.into_cookie(config));

    Ok(())
}

#[post("/auth/member/register", data = "<credentials>", format = "json")]
async fn register_member(
    cookies: &CookieJar<'_>,
    credentials: Json<MemberCredentials>,
    new_members: Coll<NewMember>,
    members: Coll<Member>,
    config: &State<Config>,
) -> Result<()> {
    let username = credentials.username.clone();
    let new_member: NewMember = credentials.0.try_into().map_err(|_| {
        Error::Status(
            Status::BadRequest,
            "Illegal member credentials".to_string(),
        )
    })?;

    // The unique index on usernames catches a registration race.
    new_members
        .insert_one(&new_member, None)
        .await
        .map_err(|err| {
            if is_duplicate_key_error(&err) {
                Error::Status(
                    Status::BadRequest,
                    format!("Member username already in use: {username}"),
                )
            } else {
                err.into()
            }
        })?;

    let with_username = doc! {
        "username": &username,
    };
    let member = members
        .find_one(with_username, None)
        .await?
        .ok_or_else(|| Error::not_found(format!("Member {username}")))?;

    let token = AuthToken::new(&member);
    cookies.add(token.into_cookie(config));

    Ok(())
}

#[post("/auth/member", data = "<credentials>", format = "json")]
async fn authenticate_member(
    cookies: &CookieJar<'_>,
    credentials: Json<MemberCredentials>,
    members: Coll<Member>,
    config: &State<Config>,
) -> Result<()> {
    let with_username = doc! {
        "username": &credentials.username,
    };

    let member = members
        .find_one(with_username, None)
        .await?
        .filter(|member| member.verify_password(&credentials.password))
        .ok_or_else(|| {
            Error::Status(
                Status::Unauthorized,
                "No member found with the provided username and password combination.".to_string(),
            )
        })?;

    let token = AuthToken::new(&member);
    cookies.add(token.into_cookie(config));

    Ok(())
}

#[post("/auth/logout")]
fn logout(cookies: &CookieJar) -> Status {
    cookies.remove(Cookie::named(AUTH_TOKEN_COOKIE));
    Status::Ok
}
