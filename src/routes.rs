use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::get,
};
use serde::Deserialize;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::{
    AppState, catalog,
    error::{AppError, AppResult},
    models::{MovieDetails, MovieFilter, MovieSummary, PersonDetails},
};

const DEFAULT_RECOMMENDATION_GENRE: &str = "Drama";

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/movies", get(list_movies))
        .route("/api/movies/{imdb_id}", get(get_movie))
        .route("/api/genres", get(list_genres))
        .route("/api/recommendations", get(recommendations))
        .route("/api/people/{imdb_id}", get(get_person))
        .with_state(state)
        .layer(CorsLayer::new().allow_origin(Any).allow_headers(Any))
        .layer(TraceLayer::new_for_http())
}

pub async fn list_movies(
    State(state): State<Arc<AppState>>,
    Query(filter): Query<MovieFilter>,
) -> AppResult<Json<Vec<MovieSummary>>> {
    Ok(Json(catalog::list_movies(&state.db, &filter).await?))
}

pub async fn get_movie(
    State(state): State<Arc<AppState>>,
    Path(imdb_id): Path<String>,
) -> AppResult<Json<MovieDetails>> {
    catalog::get_movie(&state.db, &imdb_id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::not_found(format!("movie {imdb_id} not found")))
}

pub async fn list_genres(State(state): State<Arc<AppState>>) -> AppResult<Json<Vec<String>>> {
    Ok(Json(catalog::list_genres(&state.db).await?))
}

#[derive(Debug, Deserialize)]
pub struct RecommendQuery {
    genre: Option<String>,
}

pub async fn recommendations(
    State(state): State<Arc<AppState>>,
    Query(q): Query<RecommendQuery>,
) -> AppResult<Json<Vec<MovieSummary>>> {
    let genre = q
        .genre
        .as_deref()
        .map(str::trim)
        .filter(|g| !g.is_empty())
        .unwrap_or(DEFAULT_RECOMMENDATION_GENRE);
    Ok(Json(catalog::recommend(&state.db, genre).await?))
}

pub async fn get_person(
    State(state): State<Arc<AppState>>,
    Path(imdb_id): Path<String>,
) -> AppResult<Json<PersonDetails>> {
    catalog::get_person(&state.db, &imdb_id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::not_found(format!("person {imdb_id} not found")))
}

#[cfg(test)]
mod tests {
    use axum::{
        body::{Body, to_bytes},
        http::{Request, StatusCode},
    };
    use serde_json::Value;
    use tower::ServiceExt;

    use super::*;
    use crate::{
        db::test_db,
        models::{Credit, Movie, Role},
        store::Store,
    };

    async fn app() -> (tempfile::TempDir, Router) {
        let (dir, db) = test_db().await;
        let store = Store::new(db.clone());
        store
            .upsert_movie(&Movie {
                imdb_id: "tt0111161".into(),
                title: Some("The Shawshank Redemption".into()),
                year: Some(1994),
                rating: Some(9.3),
                genres: vec!["Drama".into()],
                credits: vec![Credit {
                    person_id: "nm0000151".into(),
                    name: "Morgan Freeman".into(),
                    role: Role::Actor,
                }],
                ..Default::default()
            })
            .await
            .unwrap();
        store
            .upsert_movie(&Movie {
                imdb_id: "tt0068646".into(),
                title: Some("The Godfather".into()),
                year: Some(1972),
                rating: Some(9.2),
                genres: vec!["Crime".into(), "Drama".into()],
                ..Default::default()
            })
            .await
            .unwrap();
        (dir, router(Arc::new(AppState { db })))
    }

    async fn get_json(app: Router, uri: &str) -> (StatusCode, Value) {
        let resp =
            app.oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap()).await.unwrap();
        let status = resp.status();
        let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn movies_are_listed_best_first() {
        let (_dir, app) = app().await;
        let (status, body) = get_json(app, "/api/movies?limit=10").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body[0]["imdb_id"], "tt0111161");
        assert_eq!(body[1]["imdb_id"], "tt0068646");
    }

    #[tokio::test]
    async fn movie_filters_come_from_the_query_string() {
        let (_dir, app) = app().await;
        let (_, body) = get_json(app, "/api/movies?genre=Crime").await;
        assert_eq!(body.as_array().unwrap().len(), 1);
        assert_eq!(body[0]["title"], "The Godfather");
    }

    #[tokio::test]
    async fn movie_details_and_missing_movies() {
        let (_dir, app) = app().await;
        let (status, body) = get_json(app.clone(), "/api/movies/tt0111161").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["genres"][0], "Drama");
        assert_eq!(body["people"][0]["name"], "Morgan Freeman");
        assert_eq!(body["people"][0]["role"], "Actor");

        let (status, body) = get_json(app, "/api/movies/tt0000000").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(body["error"].as_str().unwrap().contains("tt0000000"));
    }

    #[tokio::test]
    async fn genres_and_default_recommendations() {
        let (_dir, app) = app().await;
        let (_, genres) = get_json(app.clone(), "/api/genres").await;
        assert_eq!(genres, serde_json::json!(["Crime", "Drama"]));

        let (_, recs) = get_json(app, "/api/recommendations").await;
        assert_eq!(recs.as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn people_are_served_by_identifier() {
        let (_dir, app) = app().await;
        let (status, body) = get_json(app.clone(), "/api/people/nm0000151").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["name"], "Morgan Freeman");
        assert_eq!(body["credits"][0]["imdb_id"], "tt0111161");

        let (status, _) = get_json(app, "/api/people/nm0000000").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
