use serde::Deserialize;
use serde_json::json;
use sqlx::{Pool, Postgres};
use warp::http::{header, StatusCode};
use warp::{reject::Rejection, reply::Reply};

use crate::{
    actions::{follows, ingredients, lists, recipes, shopping_list, tags, users},
    error::ApiError,
    jwt::SessionData,
    schema::{IngredientFilter, ListKind, NewRecipe, RecipeFilter},
};

#[derive(Debug, Deserialize)]
pub struct SignupForm {
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
}

pub async fn signup(form: SignupForm, pool: Pool<Postgres>) -> Result<impl Reply, Rejection> {
    let id = users::register_user(
        &form.username,
        &form.email,
        &form.first_name,
        &form.last_name,
        &form.password,
        &pool,
    )
    .await?;

    Ok(warp::reply::with_status(
        warp::reply::json(&json!({ "id": id })),
        StatusCode::CREATED,
    ))
}

pub async fn login(form: LoginForm, pool: Pool<Postgres>) -> Result<impl Reply, Rejection> {
    let token = users::login_user(&form.username, &form.password, &pool).await?;

    let reply = warp::reply::json(&json!({ "token": token }));
    Ok(warp::reply::with_header(
        reply,
        header::SET_COOKIE,
        format!("session={token}; HttpOnly; Path=/"),
    ))
}

pub async fn list_recipes(
    filter: RecipeFilter,
    session: Option<SessionData>,
    pool: Pool<Postgres>,
) -> Result<impl Reply, Rejection> {
    let viewer = session.map(|s| s.user_id);
    let page = recipes::fetch_recipes(&filter, viewer, &pool).await?;

    Ok(warp::reply::json(&page))
}

pub async fn get_recipe(
    id: i32,
    session: Option<SessionData>,
    pool: Pool<Postgres>,
) -> Result<impl Reply, Rejection> {
    let viewer = session.map(|s| s.user_id);
    let view = recipes::get_recipe_view(id, viewer, &pool).await?;

    Ok(warp::reply::json(&view))
}

pub async fn create_recipe(
    session: SessionData,
    payload: NewRecipe,
    pool: Pool<Postgres>,
) -> Result<impl Reply, Rejection> {
    let view = recipes::create_recipe(&session, &payload, &pool).await?;

    Ok(warp::reply::with_status(
        warp::reply::json(&view),
        StatusCode::CREATED,
    ))
}

pub async fn update_recipe(
    id: i32,
    session: SessionData,
    payload: NewRecipe,
    pool: Pool<Postgres>,
) -> Result<impl Reply, Rejection> {
    let view = recipes::update_recipe(id, &session, &payload, &pool).await?;

    Ok(warp::reply::json(&view))
}

pub async fn delete_recipe(
    id: i32,
    session: SessionData,
    pool: Pool<Postgres>,
) -> Result<impl Reply, Rejection> {
    recipes::delete_recipe(id, &session, &pool).await?;

    Ok(StatusCode::NO_CONTENT)
}

pub async fn add_to_list(
    id: i32,
    kind: ListKind,
    session: SessionData,
    pool: Pool<Postgres>,
) -> Result<impl Reply, Rejection> {
    let recipe = lists::add_to_list(session.user_id, id, kind, &pool).await?;

    Ok(warp::reply::with_status(
        warp::reply::json(&recipe),
        StatusCode::CREATED,
    ))
}

pub async fn remove_from_list(
    id: i32,
    kind: ListKind,
    session: SessionData,
    pool: Pool<Postgres>,
) -> Result<impl Reply, Rejection> {
    lists::remove_from_list(session.user_id, id, kind, &pool).await?;

    Ok(StatusCode::NO_CONTENT)
}

pub async fn download_shopping_cart(
    session: SessionData,
    pool: Pool<Postgres>,
) -> Result<impl Reply, Rejection> {
    let list = shopping_list::build_shopping_list(session.user_id, &pool).await?;

    let response = warp::http::Response::builder()
        .header(header::CONTENT_TYPE, "text/plain; charset=utf-8")
        .header(
            header::CONTENT_DISPOSITION,
            format!("attachment; filename={}", list.filename),
        )
        .body(list.content)
        .map_err(|e| ApiError::Database(format!("failed to build response: {e}")))?;

    Ok(response)
}

pub async fn subscribe(
    author_id: i32,
    session: SessionData,
    pool: Pool<Postgres>,
) -> Result<impl Reply, Rejection> {
    let author = follows::subscribe(session.user_id, author_id, &pool).await?;

    Ok(warp::reply::with_status(
        warp::reply::json(&author),
        StatusCode::CREATED,
    ))
}

pub async fn unsubscribe(
    author_id: i32,
    session: SessionData,
    pool: Pool<Postgres>,
) -> Result<impl Reply, Rejection> {
    follows::unsubscribe(session.user_id, author_id, &pool).await?;

    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    pub offset: Option<i64>,
}

pub async fn list_subscriptions(
    query: PageQuery,
    session: SessionData,
    pool: Pool<Postgres>,
) -> Result<impl Reply, Rejection> {
    let page =
        follows::list_subscriptions(session.user_id, query.offset.unwrap_or(0), &pool).await?;

    Ok(warp::reply::json(&page))
}

pub async fn user_profile(
    id: i32,
    session: Option<SessionData>,
    pool: Pool<Postgres>,
) -> Result<impl Reply, Rejection> {
    let viewer = session.map(|s| s.user_id);
    let profile = users::user_profile(id, viewer, &pool).await?;

    Ok(warp::reply::json(&profile))
}

pub async fn list_tags(pool: Pool<Postgres>) -> Result<impl Reply, Rejection> {
    let list = tags::list_tags(&pool).await?;

    Ok(warp::reply::json(&list))
}

pub async fn get_tag(id: i32, pool: Pool<Postgres>) -> Result<impl Reply, Rejection> {
    let tag = tags::get_tag(id, &pool)
        .await?
        .ok_or_else(|| ApiError::not_found("tag"))?;

    Ok(warp::reply::json(&tag))
}

pub async fn list_ingredients(
    filter: IngredientFilter,
    pool: Pool<Postgres>,
) -> Result<impl Reply, Rejection> {
    let list = ingredients::fetch_ingredients(&filter, &pool).await?;

    Ok(warp::reply::json(&list))
}

pub async fn get_ingredient(id: i32, pool: Pool<Postgres>) -> Result<impl Reply, Rejection> {
    let ingredient = ingredients::get_ingredient(id, &pool)
        .await?
        .ok_or_else(|| ApiError::not_found("ingredient"))?;

    Ok(warp::reply::json(&ingredient))
}
