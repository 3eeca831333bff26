use sqlx::{Pool, Postgres};
use warp::{reject::Rejection, reply::Reply, Filter};

use crate::{
    middleware::{with_possible_session, with_session},
    schema::ListKind,
};

use super::{handlers, rejection::handle_rejection};

fn with_pool(
    pool: Pool<Postgres>,
) -> impl Filter<Extract = (Pool<Postgres>,), Error = std::convert::Infallible> + Clone {
    warp::any().map(move || pool.clone())
}

/// The complete filter tree for the REST surface. Terminal recovery
/// turns every rejection into a JSON error body, so the composed
/// filter cannot fail.
pub fn routes(
    pool: Pool<Postgres>,
) -> impl Filter<Extract = (impl Reply,), Error = std::convert::Infallible> + Clone {
    auth_routes(pool.clone())
        .or(recipe_routes(pool.clone()))
        .or(user_routes(pool.clone()))
        .or(reference_routes(pool))
        .recover(handle_rejection)
}

fn auth_routes(
    pool: Pool<Postgres>,
) -> impl Filter<Extract = (impl Reply,), Error = Rejection> + Clone {
    let signup = warp::path!("auth" / "signup")
        .and(warp::post())
        .and(warp::body::json())
        .and(with_pool(pool.clone()))
        .and_then(handlers::signup);

    let login = warp::path!("auth" / "login")
        .and(warp::post())
        .and(warp::body::json())
        .and(with_pool(pool))
        .and_then(handlers::login);

    signup.or(login)
}

fn recipe_routes(
    pool: Pool<Postgres>,
) -> impl Filter<Extract = (impl Reply,), Error = Rejection> + Clone {
    // fixed segment first so it never shadows /recipes/{id}
    let download = warp::path!("recipes" / "download_shopping_cart")
        .and(warp::get())
        .and(with_session())
        .and(with_pool(pool.clone()))
        .and_then(handlers::download_shopping_cart);

    let list = warp::path!("recipes")
        .and(warp::get())
        .and(warp::query())
        .and(with_possible_session())
        .and(with_pool(pool.clone()))
        .and_then(handlers::list_recipes);

    let create = warp::path!("recipes")
        .and(warp::post())
        .and(with_session())
        .and(warp::body::json())
        .and(with_pool(pool.clone()))
        .and_then(handlers::create_recipe);

    let get = warp::path!("recipes" / i32)
        .and(warp::get())
        .and(with_possible_session())
        .and(with_pool(pool.clone()))
        .and_then(handlers::get_recipe);

    let update = warp::path!("recipes" / i32)
        .and(warp::patch())
        .and(with_session())
        .and(warp::body::json())
        .and(with_pool(pool.clone()))
        .and_then(handlers::update_recipe);

    let delete = warp::path!("recipes" / i32)
        .and(warp::delete())
        .and(with_session())
        .and(with_pool(pool.clone()))
        .and_then(handlers::delete_recipe);

    let favorite = membership_routes(pool.clone(), "favorite", ListKind::Favorite);
    let shopping_cart = membership_routes(pool, "shopping_cart", ListKind::ShoppingCart);

    download
        .or(list)
        .or(create)
        .or(get)
        .or(update)
        .or(delete)
        .or(favorite)
        .or(shopping_cart)
}

/// POST/DELETE toggle pair for one membership kind. Favorite and
/// shopping cart share everything but the path segment.
fn membership_routes(
    pool: Pool<Postgres>,
    segment: &'static str,
    kind: ListKind,
) -> impl Filter<Extract = (impl Reply,), Error = Rejection> + Clone {
    let add = warp::path!("recipes" / i32 / ..)
        .and(warp::path(segment))
        .and(warp::path::end())
        .and(warp::post())
        .map(move |id| (id, kind))
        .untuple_one()
        .and(with_session())
        .and(with_pool(pool.clone()))
        .and_then(handlers::add_to_list);

    let remove = warp::path!("recipes" / i32 / ..)
        .and(warp::path(segment))
        .and(warp::path::end())
        .and(warp::delete())
        .map(move |id| (id, kind))
        .untuple_one()
        .and(with_session())
        .and(with_pool(pool))
        .and_then(handlers::remove_from_list);

    add.or(remove)
}

fn user_routes(
    pool: Pool<Postgres>,
) -> impl Filter<Extract = (impl Reply,), Error = Rejection> + Clone {
    let subscriptions = warp::path!("users" / "subscriptions")
        .and(warp::get())
        .and(warp::query())
        .and(with_session())
        .and(with_pool(pool.clone()))
        .and_then(handlers::list_subscriptions);

    let subscribe = warp::path!("users" / i32 / "subscribe")
        .and(warp::post())
        .and(with_session())
        .and(with_pool(pool.clone()))
        .and_then(handlers::subscribe);

    let unsubscribe = warp::path!("users" / i32 / "subscribe")
        .and(warp::delete())
        .and(with_session())
        .and(with_pool(pool.clone()))
        .and_then(handlers::unsubscribe);

    let profile = warp::path!("users" / i32)
        .and(warp::get())
        .and(with_possible_session())
        .and(with_pool(pool))
        .and_then(handlers::user_profile);

    subscriptions.or(subscribe).or(unsubscribe).or(profile)
}

fn reference_routes(
    pool: Pool<Postgres>,
) -> impl Filter<Extract = (impl Reply,), Error = Rejection> + Clone {
    let tags = warp::path!("tags")
        .and(warp::get())
        .and(with_pool(pool.clone()))
        .and_then(handlers::list_tags);

    let tag = warp::path!("tags" / i32)
        .and(warp::get())
        .and(with_pool(pool.clone()))
        .and_then(handlers::get_tag);

    let ingredients = warp::path!("ingredients")
        .and(warp::get())
        .and(warp::query())
        .and(with_pool(pool.clone()))
        .and_then(handlers::list_ingredients);

    let ingredient = warp::path!("ingredients" / i32)
        .and(warp::get())
        .and(with_pool(pool))
        .and_then(handlers::get_ingredient);

    tags.or(tag).or(ingredients).or(ingredient)
}
