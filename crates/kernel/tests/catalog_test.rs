#![allow(clippy::unwrap_used, clippy::expect_used)]
//! Movies, actors, categories and users through their services.

mod common;

use common::{TestApp, id_of, rows};
use marquee_kernel::AppError;
use marquee_kernel::models::Principal;
use marquee_kernel::query::ParamBag;
use marquee_test_utils::{test_category, test_movie, test_user};
use serde_json::json;
use uuid::Uuid;

#[tokio::test]
async fn catalog_writes_require_admin() {
    let app = TestApp::new();
    let ada = app.user("ada").await;

    let err = app
        .state
        .categories()
        .create(&ada, &test_category("Comedy"))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)));
    assert_eq!(
        err.to_string(),
        "You do not have permission to perform this action"
    );
}

#[tokio::test]
async fn movie_create_derives_fields_and_strips_aggregates() {
    let app = TestApp::new();
    let category = app.category("Science fiction").await;
    let actor = app.actor("Keanu Reeves").await;
    let body = test_movie("The Matrix", category, &[actor])
        .with_field("averageRating", json!(5))
        .with_field("ratingsCount", json!(100))
        .to_json();

    let response = app.state.movies().create(&app.admin, &body).await.unwrap();
    assert_eq!(response.status, 201);
    assert_eq!(response.message, "Movie created successfully");

    let movie = response.get("movie").unwrap();
    assert_eq!(movie["slug"], "the-matrix");
    assert_eq!(movie["averageRating"], 0.0);
    assert_eq!(movie["ratingsCount"], 0);
    assert_eq!(movie["isFeatured"], false);
    assert_eq!(movie["isActive"], true);
    assert!(movie.get("version").is_none());
}

#[tokio::test]
async fn movie_create_requires_existing_references() {
    let app = TestApp::new();
    let actor = app.actor("Keanu Reeves").await;
    let body = test_movie("The Matrix", Uuid::now_v7(), &[actor]).to_json();

    let err = app.state.movies().create(&app.admin, &body).await.unwrap_err();
    assert_eq!(err.to_string(), "Category not found");
}

#[tokio::test]
async fn movie_get_expands_references_and_embeds_comments() {
    let app = TestApp::new();
    let category = app.category("Horror").await;
    let actor = app.actor("Sigourney Weaver").await;
    let movie = app.movie_in("Alien", category, &[actor]).await;
    let ada = app
        .state
        .users()
        .create(
            &app.admin,
            &test_user("ada").with_names("Ada", "Lovelace").to_json(),
        )
        .await
        .unwrap();
    let ada = Principal::user(id_of(&ada, "user"));
    app.rate(&ada, movie, 5).await;

    let movie = app.movie_json(movie).await;
    assert_eq!(movie["category"]["name"], "Horror");
    assert_eq!(movie["actor"][0]["name"], "Sigourney Weaver");
    assert_eq!(movie["actor"][0]["avatar"], "default.jpg");
    assert_eq!(movie["comments"].as_array().unwrap().len(), 1);
    assert_eq!(movie["comments"][0]["user"]["first_name"], "Ada");
    assert_eq!(movie["comments"][0]["rating"], 5);
}

#[tokio::test]
async fn movie_update_renames_slug_and_ignores_aggregates() {
    let app = TestApp::new();
    let movie = app.movie("Alien").await;

    let response = app
        .state
        .movies()
        .update(
            &app.admin,
            &movie.to_string(),
            &json!({ "name": "Aliens", "ratingsCount": 42 }),
        )
        .await
        .unwrap();
    let movie = response.get("movie").unwrap();
    assert_eq!(movie["slug"], "aliens");
    assert_eq!(movie["ratingsCount"], 0);
}

#[tokio::test]
async fn movie_delete_cascades_comments_and_activities() {
    let app = TestApp::new();
    let movie = app.movie("Alien").await;
    let keep = app.movie("Heat").await;
    let ada = app.user("ada").await;
    app.rate(&ada, movie, 5).await;
    app.rate(&ada, keep, 3).await;

    app.state
        .movies()
        .delete(&app.admin, &movie.to_string())
        .await
        .unwrap();

    let comments = app
        .state
        .comments()
        .list(None, &ParamBag::new())
        .await
        .unwrap();
    let comments = rows(&comments, "comments");
    assert_eq!(comments.len(), 1);
    assert_eq!(comments[0]["movie"], keep.to_string());
    let activities = app.state.store().count_by("activities", "movie").await.unwrap();
    assert_eq!(activities.len(), 1);
    assert_eq!(activities.get(&keep.to_string()), Some(&1));

    let err = app.state.movies().get(&movie.to_string()).await.unwrap_err();
    assert_eq!(err.to_string(), "Movie not found");
}

#[tokio::test]
async fn toggles_flip_movie_flags() {
    let app = TestApp::new();
    let movie = app.movie("Alien").await;
    let id = movie.to_string();

    let response = app.state.movies().toggle_featured(&app.admin, &id).await.unwrap();
    assert_eq!(response.get("movie").unwrap()["isFeatured"], true);

    let response = app.state.movies().toggle_active(&app.admin, &id).await.unwrap();
    assert_eq!(response.message, "Movie status has successfully updated");
    assert_eq!(response.get("movie").unwrap()["isActive"], false);
}

#[tokio::test]
async fn movie_comment_stats_rank_by_discussion() {
    let app = TestApp::new();
    let quiet = app.movie("Quiet").await;
    let busy = app.movie("Busy").await;
    let ada = app.user("ada").await;
    let bob = app.user("bob").await;
    app.rate(&ada, busy, 4).await;
    app.rate(&bob, busy, 2).await;
    app.rate(&ada, quiet, 5).await;

    let response = app.state.movies().comment_stats().await.unwrap();
    let stats = rows(&response, "stats");
    assert_eq!(stats[0]["name"], "Busy");
    assert_eq!(stats[0]["comments_count"], 2);
    assert_eq!(stats[1]["name"], "Quiet");
    assert_eq!(stats[1]["comments_count"], 1);
    assert!(stats[0].get("category").is_none());
}

#[tokio::test]
async fn duplicate_category_names_conflict() {
    let app = TestApp::new();
    app.category("Comedy").await;

    let err = app
        .state
        .categories()
        .create(&app.admin, &test_category("Comedy"))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Duplicate { .. }));
    assert_eq!(err.status_code().as_u16(), 409);
}

#[tokio::test]
async fn category_validation_and_deactivation() {
    let app = TestApp::new();
    let err = app
        .state
        .categories()
        .create(&app.admin, &test_category("ab"))
        .await
        .unwrap_err();
    assert!(err.to_string().contains("three(3)"));

    let category = app.category("Comedy").await;
    let response = app
        .state
        .categories()
        .deactivate(&app.admin, &category.to_string())
        .await
        .unwrap();
    assert_eq!(response.get("category").unwrap()["isActive"], false);

    let response = app
        .state
        .categories()
        .list(&ParamBag::from_query_str("isActive=false"))
        .await
        .unwrap();
    assert_eq!(rows(&response, "categories").len(), 1);
}

#[tokio::test]
async fn category_and_actor_stats_count_movies() {
    let app = TestApp::new();
    let horror = app.category("Horror").await;
    let comedy = app.category("Comedy").await;
    let star = app.actor("Star").await;
    let extra = app.actor("Extra").await;
    app.movie_in("Alien", horror, &[star, extra]).await;
    app.movie_in("Aliens", horror, &[star]).await;
    app.movie_in("Airplane", comedy, &[star]).await;

    let response = app.state.categories().stats().await.unwrap();
    let stats = rows(&response, "stats");
    assert_eq!(stats[0]["name"], "Horror");
    assert_eq!(stats[0]["movies_count"], 2);

    let response = app.state.actors().stats().await.unwrap();
    let stats = rows(&response, "stats");
    assert_eq!(stats[0]["name"], "Star");
    assert_eq!(stats[0]["movies_count"], 3);
    assert_eq!(stats[1]["name"], "Extra");
    assert_eq!(stats[1]["movies_count"], 1);
}

#[tokio::test]
async fn update_me_rejects_passwords() {
    let app = TestApp::new();
    let ada = app.user("ada").await;

    let err = app
        .state
        .users()
        .update_me(&ada, &json!({ "password": "hunter22" }))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::ValidationFailed(_)));
    assert!(err.to_string().contains("You can not update password with this request"));

    let response = app
        .state
        .users()
        .update_me(&ada, &json!({ "first_name": "Augusta", "role": "admin" }))
        .await
        .unwrap();
    assert_eq!(response.message, "Data updated successfully");
    let user = response.get("user").unwrap();
    assert_eq!(user["first_name"], "Augusta");
    assert_eq!(user["role"], "user");
}

#[tokio::test]
async fn me_returns_the_callers_profile() {
    let app = TestApp::new();
    app.user("bob").await;
    let ada = app.user("ada").await;

    let response = app.state.users().me(&ada).await.unwrap();
    assert_eq!(response.message, "User retrieved");
    assert_eq!(response.get("user").unwrap()["username"], "ada");

    let stranger = Principal::user(Uuid::now_v7());
    let err = app.state.users().me(&stranger).await.unwrap_err();
    assert_eq!(err.status_code().as_u16(), 404);
}

#[tokio::test]
async fn duplicate_usernames_conflict() {
    let app = TestApp::new();
    app.user("ada").await;

    let body = test_user("ada").with_email("other@example.com").to_json();
    let err = app.state.users().create(&app.admin, &body).await.unwrap_err();
    assert!(matches!(err, AppError::Duplicate { ref field, .. } if field == "username"));
}

#[tokio::test]
async fn user_comment_stats() {
    let app = TestApp::new();
    let movie = app.movie("Alien").await;
    let ada = app.user("ada").await;
    app.user("bob").await;
    app.rate(&ada, movie, 4).await;

    let response = app.state.users().comment_stats().await.unwrap();
    let stats = rows(&response, "stats");
    assert_eq!(stats[0]["username"], "ada");
    assert_eq!(stats[0]["user_comments_count"], 1);
    assert_eq!(stats[1]["user_comments_count"], 0);
    assert!(stats[0].get("email").is_none());
}
