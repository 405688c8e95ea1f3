//! # iv-api Handlers
//!
//! Coordinates the flow between HTTP requests and the core ports. Every
//! owner-scoped route resolves the bearer token to a user id first; the
//! pure engines in `iv-core` derive the list/calendar/dashboard views
//! from a full per-owner snapshot loaded on each request (the client
//! refetches after every mutation rather than patching locally).

use std::collections::BTreeMap;

use actix_multipart::Multipart;
use actix_web::http::header;
use actix_web::{web, HttpRequest, HttpResponse};
use chrono::NaiveDate;
use futures_util::TryStreamExt;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use iv_core::calendar::{count_by_period, group_by_day, month_grid, Period};
use iv_core::filter::{
    count_by_mood, count_by_status, count_by_tag, filter_by_mood, filter_by_status_and_favorite,
    filter_by_tags, MoodCounts, StatusBreakdown, StatusFilter, StatusPercentages, TagCount,
};
use iv_core::{AppError, AuthProvider, Idea, IdeaDraft, IdeaPatch, IdeaRepo, MediaStore, Mood};

use crate::error::ApiError;

/// State shared across all actix workers.
pub struct AppState {
    pub repo: Box<dyn IdeaRepo>,
    pub store: Box<dyn MediaStore>,
    pub auth: Box<dyn AuthProvider>,
}

fn bearer_token(req: &HttpRequest) -> Result<&str, ApiError> {
    req.headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .filter(|token| !token.is_empty())
        .ok_or_else(|| ApiError(AppError::Unauthenticated("missing bearer token".into())))
}

async fn current_user(state: &AppState, req: &HttpRequest) -> Result<String, ApiError> {
    let token = bearer_token(req)?;
    Ok(state.auth.current_user(token).await?)
}

#[derive(Debug, Deserialize)]
pub struct SignInRequest {
    pub username: String,
    pub password: String,
}

pub async fn sign_in(
    state: web::Data<AppState>,
    body: web::Json<SignInRequest>,
) -> Result<HttpResponse, ApiError> {
    let session = state.auth.sign_in(&body.username, &body.password).await?;
    Ok(HttpResponse::Ok().json(session))
}

pub async fn sign_out(
    state: web::Data<AppState>,
    req: HttpRequest,
) -> Result<HttpResponse, ApiError> {
    let token = bearer_token(&req)?;
    state.auth.sign_out(token).await?;
    Ok(HttpResponse::NoContent().finish())
}

#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    /// `all | open | completed | discarded`; anything else means `all`.
    pub status: Option<String>,
    /// When true, keep only favorites (AND-composed with `status`).
    pub favorites: Option<bool>,
    /// Exact mood match; unrecognized values drop the filter.
    pub mood: Option<String>,
    /// Comma-separated list; keeps ideas carrying at least one of them.
    pub tags: Option<String>,
}

pub async fn list_ideas(
    state: web::Data<AppState>,
    req: HttpRequest,
    query: web::Query<ListQuery>,
) -> Result<HttpResponse, ApiError> {
    let owner = current_user(&state, &req).await?;
    let ideas = state.repo.list(&owner).await?;

    let status = query
        .status
        .as_deref()
        .map(StatusFilter::parse)
        .unwrap_or_default();
    let mut filtered =
        filter_by_status_and_favorite(&ideas, status, query.favorites.unwrap_or(false));

    if let Some(mood) = query
        .mood
        .as_deref()
        .map(Mood::parse)
        .filter(|mood| *mood != Mood::Unknown)
    {
        filtered = filter_by_mood(&filtered, mood);
    }

    let tags: Vec<String> = query
        .tags
        .as_deref()
        .map(|raw| {
            raw.split(',')
                .map(str::trim)
                .filter(|tag| !tag.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();
    if !tags.is_empty() {
        filtered = filter_by_tags(&filtered, &tags);
    }

    Ok(HttpResponse::Ok().json(filtered))
}

pub async fn create_idea(
    state: web::Data<AppState>,
    req: HttpRequest,
    body: web::Json<IdeaDraft>,
) -> Result<HttpResponse, ApiError> {
    let owner = current_user(&state, &req).await?;
    let draft = body.into_inner();
    let uploaded = draft.image_url.clone();
    match state.repo.create(&owner, draft).await {
        Ok(idea) => Ok(HttpResponse::Created().json(idea)),
        Err(err) => {
            // The image was stored before the row write; don't leak it.
            // The URL comes from the client, and deduped files are
            // shared, so only remove objects no idea still references.
            if let Some(url) = uploaded {
                match state.repo.image_referenced(&url).await {
                    Ok(false) => {
                        if let Err(remove_err) = state.store.remove(&url).await {
                            log::warn!("orphaned upload {url} could not be removed: {remove_err}");
                        }
                    }
                    Ok(true) => {}
                    // When in doubt, leak the object rather than risk a
                    // dangling reference.
                    Err(check_err) => {
                        log::warn!("skipping orphan cleanup for {url}: {check_err}");
                    }
                }
            }
            Err(ApiError(err))
        }
    }
}

pub async fn update_idea(
    state: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<Uuid>,
    body: web::Json<IdeaPatch>,
) -> Result<HttpResponse, ApiError> {
    let owner = current_user(&state, &req).await?;
    state
        .repo
        .update(&owner, path.into_inner(), body.into_inner())
        .await?;
    Ok(HttpResponse::NoContent().finish())
}

pub async fn delete_idea(
    state: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, ApiError> {
    let owner = current_user(&state, &req).await?;
    state.repo.delete(&owner, path.into_inner()).await?;
    Ok(HttpResponse::NoContent().finish())
}

/// Accepts a multipart form with a `file` field, stores it durably, and
/// returns its public URL. The client attaches that URL to a subsequent
/// idea create/update.
pub async fn upload_image(
    state: web::Data<AppState>,
    req: HttpRequest,
    mut payload: Multipart,
) -> Result<HttpResponse, ApiError> {
    current_user(&state, &req).await?;

    while let Some(mut field) = payload
        .try_next()
        .await
        .map_err(|e| ApiError(AppError::Validation(format!("bad multipart payload: {e}"))))?
    {
        if field.name() != "file" {
            continue;
        }
        let filename = field
            .content_disposition()
            .get_filename()
            .map(str::to_owned)
            .unwrap_or_else(|| "upload".to_string());
        let mut data = Vec::new();
        while let Some(chunk) = field
            .try_next()
            .await
            .map_err(|e| ApiError(AppError::Validation(format!("truncated upload: {e}"))))?
        {
            data.extend_from_slice(&chunk);
        }
        let url = state.store.save_upload(data, &filename).await?;
        return Ok(HttpResponse::Ok().json(serde_json::json!({ "url": url })));
    }

    Err(ApiError(AppError::Validation(
        "multipart payload had no `file` field".into(),
    )))
}

/// One calendar cell: a date plus the ideas created on it.
#[derive(Debug, Serialize)]
pub struct CalendarCell {
    pub date: NaiveDate,
    pub ideas: Vec<Idea>,
}

/// View model for the calendar section.
#[derive(Debug, Serialize)]
pub struct CalendarView {
    pub year: i32,
    pub month: u32,
    /// Blank cells before the 1st (weekday index, Sunday = 0).
    pub leading_blanks: u32,
    pub cells: Vec<CalendarCell>,
}

pub async fn calendar_month(
    state: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<(i32, u32)>,
) -> Result<HttpResponse, ApiError> {
    let owner = current_user(&state, &req).await?;
    let (year, month) = path.into_inner();
    if !(1..=12).contains(&month) {
        return Err(ApiError(AppError::Validation(format!(
            "month {month} out of range 1-12"
        ))));
    }

    let ideas = state.repo.list(&owner).await?;
    let grid = month_grid(year, month);
    let mut by_day = group_by_day(&ideas);
    let cells = grid
        .days
        .iter()
        .map(|date| CalendarCell {
            date: *date,
            ideas: by_day.remove(&date.format("%Y-%m-%d").to_string()).unwrap_or_default(),
        })
        .collect();

    Ok(HttpResponse::Ok().json(CalendarView {
        year,
        month,
        leading_blanks: grid.leading_blanks,
        cells,
    }))
}

#[derive(Debug, Default, Deserialize)]
pub struct DashboardQuery {
    /// `day | week | month`; anything else means `day`.
    pub period: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct StatusView {
    pub counts: StatusBreakdown,
    pub percentages: StatusPercentages,
}

/// View model for the analytics dashboard.
#[derive(Debug, Serialize)]
pub struct DashboardView {
    pub moods: MoodCounts,
    pub timeline: BTreeMap<String, usize>,
    pub tags: Vec<TagCount>,
    pub status: StatusView,
}

pub async fn dashboard(
    state: web::Data<AppState>,
    req: HttpRequest,
    query: web::Query<DashboardQuery>,
) -> Result<HttpResponse, ApiError> {
    let owner = current_user(&state, &req).await?;
    let ideas = state.repo.list(&owner).await?;
    let period = query
        .period
        .as_deref()
        .map(Period::parse)
        .unwrap_or_default();
    let counts = count_by_status(&ideas);
    Ok(HttpResponse::Ok().json(DashboardView {
        moods: count_by_mood(&ideas),
        timeline: count_by_period(&ideas, period),
        tags: count_by_tag(&ideas),
        status: StatusView { percentages: counts.percentages(), counts },
    }))
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use actix_web::{test, App};
    use async_trait::async_trait;
    use chrono::Utc;
    use iv_core::{Result, Session, Status};

    use super::*;

    #[derive(Default)]
    struct MemRepo {
        ideas: Mutex<Vec<Idea>>,
    }

    #[async_trait]
    impl IdeaRepo for MemRepo {
        async fn list(&self, owner: &str) -> Result<Vec<Idea>> {
            let mut rows: Vec<Idea> = self
                .ideas
                .lock()
                .unwrap()
                .iter()
                .filter(|i| i.user_id == owner)
                .cloned()
                .collect();
            rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
            Ok(rows)
        }

        async fn create(&self, owner: &str, draft: IdeaDraft) -> Result<Idea> {
            if draft.text.trim().is_empty() {
                return Err(AppError::Validation("idea text must not be empty".into()));
            }
            let now = Utc::now();
            let idea = Idea {
                id: Uuid::new_v4(),
                user_id: owner.to_string(),
                text: draft.text,
                tags: draft.tags,
                mood: draft.mood,
                favorite: draft.favorite,
                status: draft.status,
                image_url: draft.image_url,
                created_at: now,
                updated_at: now,
            };
            self.ideas.lock().unwrap().push(idea.clone());
            Ok(idea)
        }

        async fn update(&self, owner: &str, id: Uuid, patch: IdeaPatch) -> Result<()> {
            let mut ideas = self.ideas.lock().unwrap();
            let idea = ideas
                .iter_mut()
                .find(|i| i.id == id && i.user_id == owner)
                .ok_or_else(|| AppError::NotFound("idea".into(), id.to_string()))?;
            if let Some(text) = patch.text {
                idea.text = text;
            }
            if let Some(tags) = patch.tags {
                idea.tags = tags;
            }
            if let Some(mood) = patch.mood {
                idea.mood = mood;
            }
            if let Some(favorite) = patch.favorite {
                idea.favorite = favorite;
            }
            if let Some(status) = patch.status {
                idea.status = status;
            }
            if let Some(image_url) = patch.image_url {
                idea.image_url = image_url;
            }
            idea.updated_at = Utc::now();
            Ok(())
        }

        async fn delete(&self, owner: &str, id: Uuid) -> Result<()> {
            self.ideas
                .lock()
                .unwrap()
                .retain(|i| !(i.id == id && i.user_id == owner));
            Ok(())
        }

        async fn image_referenced(&self, url: &str) -> Result<bool> {
            Ok(self
                .ideas
                .lock()
                .unwrap()
                .iter()
                .any(|i| i.image_url.as_deref() == Some(url)))
        }
    }

    #[derive(Default, Clone)]
    struct NullStore {
        removed: std::sync::Arc<Mutex<Vec<String>>>,
    }

    #[async_trait]
    impl MediaStore for NullStore {
        async fn save_upload(&self, _data: Vec<u8>, filename: &str) -> Result<String> {
            Ok(format!("/static/uploads/{filename}"))
        }

        async fn remove(&self, url: &str) -> Result<()> {
            self.removed.lock().unwrap().push(url.to_string());
            Ok(())
        }
    }

    struct StaticAuth;

    #[async_trait]
    impl AuthProvider for StaticAuth {
        async fn sign_in(&self, username: &str, _password: &str) -> Result<Session> {
            Ok(Session { token: "secret-token".into(), user_id: username.into() })
        }

        async fn current_user(&self, token: &str) -> Result<String> {
            if token == "secret-token" {
                Ok("user-1".to_string())
            } else {
                Err(AppError::Unauthenticated("invalid or expired session".into()))
            }
        }

        async fn sign_out(&self, _token: &str) -> Result<()> {
            Ok(())
        }
    }

    fn state() -> web::Data<AppState> {
        web::Data::new(AppState {
            repo: Box::new(MemRepo::default()),
            store: Box::new(NullStore::default()),
            auth: Box::new(StaticAuth),
        })
    }

    macro_rules! service {
        ($state:expr) => {
            test::init_service(
                App::new()
                    .app_data($state.clone())
                    .configure(crate::configure_routes),
            )
            .await
        };
    }

    fn authed(req: test::TestRequest) -> test::TestRequest {
        req.insert_header((header::AUTHORIZATION, "Bearer secret-token"))
    }

    #[actix_web::test]
    async fn owner_scoped_routes_require_a_session() {
        let app = service!(state());
        let resp = test::call_service(&app, test::TestRequest::get().uri("/api/ideas").to_request())
            .await;
        assert_eq!(resp.status(), 401);

        let resp = test::call_service(
            &app,
            test::TestRequest::get()
                .uri("/api/dashboard")
                .insert_header((header::AUTHORIZATION, "Bearer wrong"))
                .to_request(),
        )
        .await;
        assert_eq!(resp.status(), 401);
    }

    #[actix_web::test]
    async fn create_then_list_round_trips() {
        let app = service!(state());
        let draft = serde_json::json!({
            "text": "Build a kayak",
            "tags": ["outdoors", "diy"],
            "mood": "wild",
        });
        let resp = test::call_service(
            &app,
            authed(test::TestRequest::post().uri("/api/ideas").set_json(&draft)).to_request(),
        )
        .await;
        assert_eq!(resp.status(), 201);

        let listed: Vec<Idea> = test::call_and_read_body_json(
            &app,
            authed(test::TestRequest::get().uri("/api/ideas")).to_request(),
        )
        .await;
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].text, "Build a kayak");
        assert_eq!(listed[0].status, Status::Open);
        assert!(!listed[0].favorite);
    }

    #[actix_web::test]
    async fn favorite_toggle_shows_up_in_filters() {
        let app = service!(state());
        let created: Idea = test::call_and_read_body_json(
            &app,
            authed(test::TestRequest::post().uri("/api/ideas").set_json(serde_json::json!({
                "text": "Build a kayak",
                "tags": ["outdoors", "diy"],
                "mood": "wild",
            })))
            .to_request(),
        )
        .await;

        let resp = test::call_service(
            &app,
            authed(
                test::TestRequest::put()
                    .uri(&format!("/api/ideas/{}", created.id))
                    .set_json(serde_json::json!({ "favorite": true })),
            )
            .to_request(),
        )
        .await;
        assert_eq!(resp.status(), 204);

        let favorites: Vec<Idea> = test::call_and_read_body_json(
            &app,
            authed(test::TestRequest::get().uri("/api/ideas?status=open&favorites=true"))
                .to_request(),
        )
        .await;
        assert_eq!(favorites.len(), 1);
        assert!(favorites[0].favorite);
        assert_eq!(favorites[0].text, "Build a kayak");

        let completed: Vec<Idea> = test::call_and_read_body_json(
            &app,
            authed(test::TestRequest::get().uri("/api/ideas?status=completed")).to_request(),
        )
        .await;
        assert!(completed.is_empty());
    }

    #[actix_web::test]
    async fn dashboard_on_empty_collection_is_all_zero() {
        let app = service!(state());
        let body: serde_json::Value = test::call_and_read_body_json(
            &app,
            authed(test::TestRequest::get().uri("/api/dashboard")).to_request(),
        )
        .await;
        assert_eq!(body["moods"]["happy"], 0);
        assert_eq!(body["status"]["percentages"]["open"], 0.0);
        assert_eq!(body["tags"].as_array().unwrap().len(), 0);
    }

    #[actix_web::test]
    async fn calendar_rejects_month_thirteen() {
        let app = service!(state());
        let resp = test::call_service(
            &app,
            authed(test::TestRequest::get().uri("/api/calendar/2024/13")).to_request(),
        )
        .await;
        assert_eq!(resp.status(), 400);
    }

    #[actix_web::test]
    async fn failed_create_removes_orphaned_upload() {
        let store = NullStore::default();
        let state = web::Data::new(AppState {
            repo: Box::new(MemRepo::default()),
            store: Box::new(store.clone()),
            auth: Box::new(StaticAuth),
        });
        let app = service!(state);
        let resp = test::call_service(
            &app,
            authed(test::TestRequest::post().uri("/api/ideas").set_json(serde_json::json!({
                "text": "   ",
                "image_url": "/static/uploads/ab/cd/abcd.png",
            })))
            .to_request(),
        )
        .await;
        assert_eq!(resp.status(), 400);
        let removed = store.removed.lock().unwrap();
        assert_eq!(removed.as_slice(), ["/static/uploads/ab/cd/abcd.png"]);
    }

    #[actix_web::test]
    async fn failed_create_spares_images_other_ideas_reference() {
        let store = NullStore::default();
        let state = web::Data::new(AppState {
            repo: Box::new(MemRepo::default()),
            store: Box::new(store.clone()),
            auth: Box::new(StaticAuth),
        });
        let app = service!(state);

        // an existing idea already points at the (deduped) file
        let resp = test::call_service(
            &app,
            authed(test::TestRequest::post().uri("/api/ideas").set_json(serde_json::json!({
                "text": "keeps its picture",
                "image_url": "/static/uploads/ab/cd/abcd.png",
            })))
            .to_request(),
        )
        .await;
        assert_eq!(resp.status(), 201);

        // a failing draft naming the same URL must not tear it down
        let resp = test::call_service(
            &app,
            authed(test::TestRequest::post().uri("/api/ideas").set_json(serde_json::json!({
                "text": "   ",
                "image_url": "/static/uploads/ab/cd/abcd.png",
            })))
            .to_request(),
        )
        .await;
        assert_eq!(resp.status(), 400);
        assert!(store.removed.lock().unwrap().is_empty());

        let listed: Vec<Idea> = test::call_and_read_body_json(
            &app,
            authed(test::TestRequest::get().uri("/api/ideas")).to_request(),
        )
        .await;
        assert_eq!(
            listed[0].image_url.as_deref(),
            Some("/static/uploads/ab/cd/abcd.png")
        );
    }

    #[actix_web::test]
    async fn mood_and_tag_filters_compose_with_the_rest() {
        let app = service!(state());
        for (text, mood, tags) in [
            ("kayak", "wild", vec!["outdoors", "diy"]),
            ("garden", "happy", vec!["outdoors"]),
            ("zine", "wild", vec!["art"]),
        ] {
            let resp = test::call_service(
                &app,
                authed(test::TestRequest::post().uri("/api/ideas").set_json(serde_json::json!({
                    "text": text,
                    "mood": mood,
                    "tags": tags,
                })))
                .to_request(),
            )
            .await;
            assert_eq!(resp.status(), 201);
        }

        let wild: Vec<Idea> = test::call_and_read_body_json(
            &app,
            authed(test::TestRequest::get().uri("/api/ideas?mood=wild")).to_request(),
        )
        .await;
        assert_eq!(wild.len(), 2);

        let wild_diy: Vec<Idea> = test::call_and_read_body_json(
            &app,
            authed(test::TestRequest::get().uri("/api/ideas?mood=wild&tags=diy")).to_request(),
        )
        .await;
        assert_eq!(wild_diy.len(), 1);
        assert_eq!(wild_diy[0].text, "kayak");

        // contains-any across a comma-separated list
        let either: Vec<Idea> = test::call_and_read_body_json(
            &app,
            authed(test::TestRequest::get().uri("/api/ideas?tags=diy,art")).to_request(),
        )
        .await;
        assert_eq!(either.len(), 2);

        // unrecognized mood drops the filter instead of erroring
        let lenient: Vec<Idea> = test::call_and_read_body_json(
            &app,
            authed(test::TestRequest::get().uri("/api/ideas?mood=angry")).to_request(),
        )
        .await;
        assert_eq!(lenient.len(), 3);
    }
}
