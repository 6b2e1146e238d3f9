//! Marquee test utilities.
//!
//! Request-body builders for integration tests. Every builder starts from
//! a body that passes validation and renders with `to_json()`.

use serde_json::{Value as JsonValue, json};
use uuid::Uuid;

/// Create a valid movie body for the given category and actors.
pub fn test_movie(name: &str, category: Uuid, actors: &[Uuid]) -> TestMovie {
    TestMovie {
        name: name.to_string(),
        summary: format!("{name} is a film worth watching twice."),
        year_released: None,
        movie_release_date: "2020-01-01".to_string(),
        category,
        actors: actors.to_vec(),
        extra: json!({}),
    }
}

/// A movie body builder.
#[derive(Debug, Clone)]
pub struct TestMovie {
    pub name: String,
    pub summary: String,
    pub year_released: Option<String>,
    pub movie_release_date: String,
    pub category: Uuid,
    pub actors: Vec<Uuid>,
    pub extra: JsonValue,
}

impl TestMovie {
    pub fn with_summary(mut self, summary: &str) -> Self {
        self.summary = summary.to_string();
        self
    }

    pub fn released(mut self, date: &str) -> Self {
        self.movie_release_date = date.to_string();
        self
    }

    pub fn with_year(mut self, year: &str) -> Self {
        self.year_released = Some(year.to_string());
        self
    }

    /// Add a raw field, e.g. one validation should strip.
    pub fn with_field(mut self, name: &str, value: JsonValue) -> Self {
        if let Some(obj) = self.extra.as_object_mut() {
            obj.insert(name.to_string(), value);
        }
        self
    }

    pub fn to_json(&self) -> JsonValue {
        let mut body = json!({
            "name": self.name,
            "summary": self.summary,
            "movieReleaseDate": self.movie_release_date,
            "category": self.category.to_string(),
            "actor": self.actors.iter().map(Uuid::to_string).collect::<Vec<_>>(),
        });
        if let Some(obj) = body.as_object_mut() {
            if let Some(year) = &self.year_released {
                obj.insert("yearReleased".to_string(), json!(year));
            }
            if let Some(extra) = self.extra.as_object() {
                for (key, value) in extra {
                    obj.insert(key.clone(), value.clone());
                }
            }
        }
        body
    }
}

/// Create a valid comment body rating `movie`.
pub fn test_comment(movie: Uuid, rating: i64) -> TestComment {
    TestComment {
        comment: "A thoughtful take on the film.".to_string(),
        rating,
        movie,
    }
}

/// A comment body builder.
#[derive(Debug, Clone)]
pub struct TestComment {
    pub comment: String,
    pub rating: i64,
    pub movie: Uuid,
}

impl TestComment {
    pub fn with_comment(mut self, comment: &str) -> Self {
        self.comment = comment.to_string();
        self
    }

    pub fn to_json(&self) -> JsonValue {
        json!({
            "comment": self.comment,
            "rating": self.rating,
            "movie": self.movie.to_string(),
        })
    }
}

/// Create a valid profile body. Email is derived from the username.
pub fn test_user(username: &str) -> TestUser {
    TestUser {
        first_name: "Test".to_string(),
        last_name: "User".to_string(),
        username: username.to_string(),
        email: format!("{username}@example.com"),
    }
}

/// A profile body builder.
#[derive(Debug, Clone)]
pub struct TestUser {
    pub first_name: String,
    pub last_name: String,
    pub username: String,
    pub email: String,
}

impl TestUser {
    pub fn with_names(mut self, first: &str, last: &str) -> Self {
        self.first_name = first.to_string();
        self.last_name = last.to_string();
        self
    }

    pub fn with_email(mut self, email: &str) -> Self {
        self.email = email.to_string();
        self
    }

    pub fn to_json(&self) -> JsonValue {
        json!({
            "first_name": self.first_name,
            "last_name": self.last_name,
            "username": self.username,
            "email": self.email,
        })
    }
}

/// Actor body.
pub fn test_actor(name: &str) -> JsonValue {
    json!({
        "name": name,
        "description": format!("{name} has appeared in many films."),
    })
}

/// Category body, valid for movie and blog categories alike.
pub fn test_category(name: &str) -> JsonValue {
    json!({ "name": name })
}

/// Blog post body filed under `category`.
pub fn test_post(title: &str, category: Uuid) -> JsonValue {
    json!({
        "title": title,
        "body": "A long enough body for a blog post.",
        "coverImage": "https://images.example.com/cover.jpg",
        "category": category.to_string(),
    })
}

/// Blog comment body on `blog`.
pub fn test_blog_comment(blog: Uuid) -> JsonValue {
    json!({
        "comment": "Great post, thanks for writing.",
        "blog": blog.to_string(),
    })
}
