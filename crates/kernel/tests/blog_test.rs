#![allow(clippy::unwrap_used, clippy::expect_used)]
//! Blog categories, posts and post comments.

mod common;

use common::{TestApp, id_of, rows};
use marquee_kernel::AppError;
use marquee_kernel::query::ParamBag;
use marquee_test_utils::{test_blog_comment, test_category, test_post};
use serde_json::json;
use uuid::Uuid;

async fn blog_category(app: &TestApp, name: &str) -> Uuid {
    let response = app
        .state
        .blog_categories()
        .create(&app.admin, &test_category(name))
        .await
        .unwrap();
    id_of(&response, "category")
}

async fn post(app: &TestApp, title: &str, category: Uuid) -> Uuid {
    let response = app
        .state
        .blog_posts()
        .create(&app.admin, &test_post(title, category))
        .await
        .unwrap();
    id_of(&response, "post")
}

#[tokio::test]
async fn post_create_fills_defaults() {
    let app = TestApp::new();
    let category = blog_category(&app, "Behind the scenes").await;

    let response = app
        .state
        .blog_posts()
        .create(&app.admin, &test_post("Making of Alien", category))
        .await
        .unwrap();
    assert_eq!(response.message, "Post created successfully");
    let post = response.get("post").unwrap();
    assert_eq!(post["tags"], json!([]));
    assert_eq!(post["isFeatured"], false);
}

#[tokio::test]
async fn short_titles_and_missing_cover_fail_validation() {
    let app = TestApp::new();
    let category = blog_category(&app, "Reviews").await;
    let mut body = test_post("Too short", category);
    body.as_object_mut().unwrap().remove("coverImage");

    let err = app
        .state
        .blog_posts()
        .create(&app.admin, &body)
        .await
        .unwrap_err();
    let AppError::ValidationFailed(messages) = err else {
        panic!("expected validation failure");
    };
    assert!(messages.iter().any(|m| m.contains("Title can not be less than 10")));
    assert!(messages.iter().any(|m| m == "Cover image is required"));
}

#[tokio::test]
async fn blog_category_names_are_unique_and_bounded() {
    let app = TestApp::new();
    blog_category(&app, "Reviews").await;

    let err = app
        .state
        .blog_categories()
        .create(&app.admin, &test_category("Reviews"))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Duplicate { .. }));

    // Same name is fine in the movie category collection.
    app.category("Reviews").await;

    let long = "x".repeat(41);
    let err = app
        .state
        .blog_categories()
        .create(&app.admin, &test_category(&long))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::ValidationFailed(_)));
}

#[tokio::test]
async fn post_get_embeds_comments() {
    let app = TestApp::new();
    let category = blog_category(&app, "Reviews").await;
    let post = post(&app, "Why Alien still works", category).await;
    let ada = app.user("ada").await;

    app.state
        .blog_comments()
        .create(&ada, &test_blog_comment(post))
        .await
        .unwrap();

    let response = app.state.blog_posts().get(&post.to_string()).await.unwrap();
    let post = response.get("post").unwrap();
    assert_eq!(post["comments"].as_array().unwrap().len(), 1);
    assert_eq!(post["comments"][0]["user"]["first_name"], "Test");
}

#[tokio::test]
async fn comments_need_an_existing_post() {
    let app = TestApp::new();
    let ada = app.user("ada").await;

    let err = app
        .state
        .blog_comments()
        .create(&ada, &test_blog_comment(Uuid::now_v7()))
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "Post not found");
}

#[tokio::test]
async fn post_delete_cascades_its_comments() {
    let app = TestApp::new();
    let category = blog_category(&app, "Reviews").await;
    let doomed = post(&app, "Soon to be removed", category).await;
    let kept = post(&app, "Here to stay forever", category).await;
    let ada = app.user("ada").await;
    for target in [doomed, kept] {
        app.state
            .blog_comments()
            .create(&ada, &test_blog_comment(target))
            .await
            .unwrap();
    }

    app.state
        .blog_posts()
        .delete(&app.admin, &doomed.to_string())
        .await
        .unwrap();

    let response = app
        .state
        .blog_comments()
        .list(&ParamBag::new())
        .await
        .unwrap();
    let comments = rows(&response, "comments");
    assert_eq!(comments.len(), 1);
    assert_eq!(comments[0]["blog"], kept.to_string());
}

#[tokio::test]
async fn toggles_and_comment_stats() {
    let app = TestApp::new();
    let category = blog_category(&app, "Reviews").await;
    let quiet = post(&app, "A quiet little post", category).await;
    let busy = post(&app, "A much discussed post", category).await;
    let ada = app.user("ada").await;

    let response = app
        .state
        .blog_posts()
        .toggle_featured(&app.admin, &quiet.to_string())
        .await
        .unwrap();
    assert_eq!(response.message, "Post featured status updated successfully");
    assert_eq!(response.get("post").unwrap()["isFeatured"], true);

    let mut comment = Uuid::nil();
    for _ in 0..2 {
        let response = app
            .state
            .blog_comments()
            .create(&ada, &test_blog_comment(busy))
            .await
            .unwrap();
        comment = id_of(&response, "comment");
    }

    let response = app
        .state
        .blog_comments()
        .toggle_active(&app.admin, &comment.to_string())
        .await
        .unwrap();
    assert_eq!(response.message, "Comment status changed successfully");
    assert_eq!(response.get("comment").unwrap()["isActive"], false);

    let response = app.state.blog_posts().comment_stats().await.unwrap();
    let stats = rows(&response, "stats");
    assert_eq!(stats[0]["title"], "A much discussed post");
    assert_eq!(stats[0]["comments_count"], 2);
    assert_eq!(stats[1]["comments_count"], 0);
    assert!(stats[0].get("tags").is_none());
}

#[tokio::test]
async fn only_authors_or_admins_edit_blog_comments() {
    let app = TestApp::new();
    let category = blog_category(&app, "Reviews").await;
    let post = post(&app, "Open for discussion", category).await;
    let ada = app.user("ada").await;
    let bob = app.user("bob").await;
    let response = app
        .state
        .blog_comments()
        .create(&ada, &test_blog_comment(post))
        .await
        .unwrap();
    let comment = id_of(&response, "comment").to_string();
    let edit = json!({ "comment": "An edited version of it." });

    let err = app
        .state
        .blog_comments()
        .update(&bob, &comment, &edit)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)));

    app.state
        .blog_comments()
        .update(&ada, &comment, &edit)
        .await
        .unwrap();
    app.state
        .blog_comments()
        .delete(&app.admin, &comment)
        .await
        .unwrap();
}
