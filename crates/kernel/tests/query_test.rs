#![allow(clippy::unwrap_used, clippy::expect_used)]
//! Client-driven listing queries through the public services.

mod common;

use common::{TestApp, rows};
use marquee_kernel::AppError;
use marquee_kernel::AppState;
use marquee_kernel::config::QueryLimits;
use marquee_kernel::models::Principal;
use marquee_kernel::models::movie::MOVIES;
use marquee_kernel::query::{ParamBag, QueryBuilder};
use marquee_test_utils::test_category;
use serde_json::Value;
use uuid::Uuid;

async fn seed_categories(app: &TestApp, count: usize) {
    for n in 1..=count {
        app.category(&format!("Category {n:02}")).await;
    }
}

fn names(rows: &[Value]) -> Vec<String> {
    rows.iter()
        .map(|r| r["name"].as_str().unwrap().to_string())
        .collect()
}

#[tokio::test]
async fn second_page_returns_records_eleven_to_twenty() {
    let app = TestApp::new();
    seed_categories(&app, 25).await;

    let params = ParamBag::from_query_str("sort=createdAt&page=2&limit=10");
    let response = app.state.categories().list(&params).await.unwrap();
    let expected: Vec<String> = (11..=20).map(|n| format!("Category {n:02}")).collect();
    assert_eq!(names(&rows(&response, "categories")), expected);
}

#[tokio::test]
async fn default_listing_is_newest_first_with_default_page_size() {
    let app = TestApp::new();
    seed_categories(&app, 25).await;

    let response = app.state.categories().list(&ParamBag::new()).await.unwrap();
    let listed = names(&rows(&response, "categories"));
    assert_eq!(listed.len(), 10);
    assert_eq!(listed[0], "Category 25");
    assert_eq!(listed[9], "Category 16");
}

#[tokio::test]
async fn page_size_is_clamped_to_the_maximum() {
    let state = AppState::in_memory(QueryLimits::new(5, 8).unwrap());
    let admin = Principal::admin(Uuid::now_v7());
    for n in 1..=12 {
        state
            .categories()
            .create(&admin, &test_category(&format!("Category {n:02}")))
            .await
            .unwrap();
    }

    let response = state
        .categories()
        .list(&ParamBag::from_query_str("limit=1000"))
        .await
        .unwrap();
    assert_eq!(rows(&response, "categories").len(), 8);

    let response = state
        .categories()
        .list(&ParamBag::from_query_str("limit=abc"))
        .await
        .unwrap();
    assert_eq!(rows(&response, "categories").len(), 5);
}

#[test]
fn transformation_order_does_not_change_the_plan() {
    let params = ParamBag::from_query_str(
        "averageRating[gte]=3&sort=-averageRating,name&fields=name,slug&page=2&limit=5",
    );
    let limits = QueryLimits::default();

    let forward = QueryBuilder::new(&MOVIES, &params, limits)
        .filter()
        .unwrap()
        .sort()
        .unwrap()
        .limit_fields()
        .unwrap()
        .paginate()
        .build()
        .unwrap();
    let backward = QueryBuilder::new(&MOVIES, &params, limits)
        .paginate()
        .limit_fields()
        .unwrap()
        .sort()
        .unwrap()
        .filter()
        .unwrap()
        .build()
        .unwrap();
    let implicit = QueryBuilder::new(&MOVIES, &params, limits).build().unwrap();

    assert_eq!(forward, backward);
    assert_eq!(forward, implicit);
}

#[tokio::test]
async fn range_filters_select_by_rating() {
    let app = TestApp::new();
    let critic = app.user("critic").await;
    let loved = app.movie("Loved").await;
    let panned = app.movie("Panned").await;
    app.movie("Unseen").await;
    app.rate(&critic, loved, 5).await;
    app.rate(&critic, panned, 2).await;

    let response = app
        .state
        .movies()
        .list(&ParamBag::from_query_str("averageRating[gt]=3"))
        .await
        .unwrap();
    assert_eq!(names(&rows(&response, "movies")), vec!["Loved"]);

    let response = app
        .state
        .movies()
        .list(&ParamBag::from_query_str(
            "averageRating[gte]=1&averageRating[lte]=4",
        ))
        .await
        .unwrap();
    assert_eq!(names(&rows(&response, "movies")), vec!["Panned"]);

    let response = app
        .state
        .movies()
        .list(&ParamBag::from_query_str("sort=-averageRating,name"))
        .await
        .unwrap();
    assert_eq!(
        names(&rows(&response, "movies")),
        vec!["Loved", "Panned", "Unseen"]
    );
}

#[tokio::test]
async fn unsupported_operators_are_rejected() {
    let app = TestApp::new();
    app.movie("Alien").await;

    for query in [
        "averageRating[regex]=.*",
        "averageRating[ne]=1",
        "name[$where]=1",
        "password=secret",
        "sort=fields->>'x'",
    ] {
        let err = app
            .state
            .movies()
            .list(&ParamBag::from_query_str(query))
            .await
            .unwrap_err();
        assert!(
            matches!(err, AppError::MalformedQuery(_)),
            "{query} should be malformed, got {err:?}"
        );
    }
}

#[tokio::test]
async fn range_filters_work_on_text_fields() {
    let app = TestApp::new();
    for name in ["Alien", "Heat", "Zodiac"] {
        app.movie(name).await;
    }

    let response = app
        .state
        .movies()
        .list(&ParamBag::from_query_str("name[gte]=H&name[lt]=Z"))
        .await
        .unwrap();
    assert_eq!(names(&rows(&response, "movies")), vec!["Heat"]);
}

#[tokio::test]
async fn field_selection_limits_rendered_keys() {
    let app = TestApp::new();
    app.movie("Alien").await;

    let response = app
        .state
        .movies()
        .list(&ParamBag::from_query_str("fields=name,slug"))
        .await
        .unwrap();
    let row = rows(&response, "movies").remove(0);
    let keys: Vec<&str> = row.as_object().unwrap().keys().map(String::as_str).collect();
    assert_eq!(keys.len(), 3);
    assert_eq!(row["name"], "Alien");
    assert_eq!(row["slug"], "alien");
    assert!(row.get("id").is_some());
}

#[tokio::test]
async fn equality_on_a_reference_list_matches_members() {
    let app = TestApp::new();
    let category = app.category("Horror").await;
    let ripley = app.actor("Sigourney Weaver").await;
    let other = app.actor("Someone Else").await;
    app.movie_in("Alien", category, &[ripley, other]).await;
    app.movie_in("Other film", category, &[other]).await;

    let response = app
        .state
        .movies()
        .list(&ParamBag::from_query_str(&format!("actor={ripley}")))
        .await
        .unwrap();
    assert_eq!(names(&rows(&response, "movies")), vec!["Alien"]);
}
