//! Single binary web server: pick-one tournament runs and rankings via REST.
//! Run with: cargo run --bin web
//! Configuration comes from the environment (see `pick_one_tournament::config`).
//! Participants are guests identified by a cookie session unless an upstream auth proxy
//! sets `X-User-Id`, which marks them as members.

use actix_session::{storage::CookieSessionStore, Session, SessionMiddleware};
use actix_web::{
    cookie::Key,
    get, post,
    web::{Data, Json, Path, Query},
    App, HttpRequest, HttpResponse, HttpServer, Responder,
};
use chrono::{DateTime, Utc};
use pick_one_tournament::config::Config;
use pick_one_tournament::{
    back, confirm_resurrection, leaderboard, pick, restart_run, skip_resurrection, start_run,
    submit_result, CandidateStanding, JsonlStatStore, MemoryStatStore, ParticipantId, PoolCatalog,
    RankingView, ResurrectionSelection, RunId, RunView, Slot, StatQuery, StatStore, TimeRange,
    TournamentRun, WinnerResult, WriteError,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};
use uuid::Uuid;

/// Per-run entry: the run, who owns it, any finished result not yet stored, and last activity.
struct RunEntry {
    run: TournamentRun,
    participant: ParticipantId,
    unsaved: Option<WinnerResult>,
    saving: bool,
    last_activity: Instant,
}

struct Shared {
    runs: RwLock<HashMap<RunId, RunEntry>>,
    catalog: PoolCatalog,
    store: Arc<dyn StatStore>,
    stats_page_size: usize,
}

type AppState = Data<Shared>;

const GUEST_SESSION_KEY: &str = "guest_id";
const USER_HEADER: &str = "X-User-Id";

#[derive(Serialize)]
struct HealthResponse {
    ok: bool,
    service: &'static str,
}

#[derive(Serialize)]
struct TournamentSummary<'a> {
    id: &'a str,
    candidates: usize,
}

#[derive(Serialize)]
struct RunResponse {
    #[serde(flatten)]
    view: RunView,
    /// A finished result is waiting to be stored; POST .../finalize to retry.
    unsaved_result: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    save_error: Option<String>,
}

#[derive(Serialize)]
struct RankingRow<'a> {
    rank: usize,
    #[serde(flatten)]
    standing: &'a CandidateStanding,
    name: Option<&'a str>,
    win_rate: Option<f64>,
    match_win_rate: Option<f64>,
}

#[derive(Deserialize)]
struct CreateRunBody {
    tournament_id: String,
    #[serde(default)]
    sample_size: Option<usize>,
}

#[derive(Deserialize)]
struct RestartBody {
    #[serde(default)]
    sample_size: Option<usize>,
}

#[derive(Deserialize)]
struct PickBody {
    slot: Slot,
}

#[derive(Deserialize)]
struct RankingsQuery {
    #[serde(default)]
    members_only: bool,
    from: Option<DateTime<Utc>>,
    to: Option<DateTime<Utc>>,
}

/// Path segment: run id (e.g. /api/runs/{id})
#[derive(Deserialize)]
struct RunPath {
    id: RunId,
}

/// Path segment: tournament id (e.g. /api/tournaments/{id}/rankings)
#[derive(Deserialize)]
struct TournamentPath {
    id: String,
}

fn error_json(message: impl ToString) -> serde_json::Value {
    serde_json::json!({ "error": message.to_string() })
}

/// Member if an upstream proxy vouches for a user id, otherwise this session's guest id.
fn participant(req: &HttpRequest, session: &Session) -> ParticipantId {
    let user = req
        .headers()
        .get(USER_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty());
    if let Some(user) = user {
        return ParticipantId::User(user.to_string());
    }
    match session.get::<Uuid>(GUEST_SESSION_KEY) {
        Ok(Some(id)) => ParticipantId::Guest(id),
        Ok(None) | Err(_) => {
            let id = Uuid::new_v4();
            if let Err(e) = session.insert(GUEST_SESSION_KEY, id) {
                log::warn!("Could not store guest id in session: {}", e);
            }
            ParticipantId::Guest(id)
        }
    }
}

fn run_response(entry: &RunEntry, save_error: Option<String>) -> RunResponse {
    RunResponse {
        view: entry.run.view(),
        unsaved_result: entry.unsaved.is_some(),
        save_error,
    }
}

/// Lock the run map, find the caller's run, touch it, and hand it to `f`.
/// Runs belonging to someone else look the same as missing ones.
fn with_run<F>(state: &AppState, id: RunId, who: &ParticipantId, f: F) -> HttpResponse
where
    F: FnOnce(&mut RunEntry) -> HttpResponse,
{
    let mut g = match state.runs.write() {
        Ok(guard) => guard,
        Err(_) => return HttpResponse::InternalServerError().body("lock error"),
    };
    match g.get_mut(&id) {
        Some(entry) if &entry.participant == who => {
            entry.last_activity = Instant::now();
            f(entry)
        }
        _ => HttpResponse::NotFound().json(error_json("No run")),
    }
}

fn owns_run(state: &AppState, id: RunId, who: &ParticipantId) -> bool {
    state
        .runs
        .read()
        .map(|g| g.get(&id).map_or(false, |e| &e.participant == who))
        .unwrap_or(false)
}

fn is_idle(entry: &RunEntry, idle_timeout: Duration) -> bool {
    entry.last_activity.elapsed() >= idle_timeout
}

/// Idle runs may go, unless a finished result is still waiting to be stored.
fn is_evictable(entry: &RunEntry, idle_timeout: Duration) -> bool {
    is_idle(entry, idle_timeout) && entry.unsaved.is_none() && !entry.saving
}

/// Move a newly finished result into the entry's outbox.
fn capture_result(entry: &mut RunEntry) {
    if let Some(result) = entry.run.take_result() {
        entry.unsaved = Some(result);
    }
}

/// Store the run's unsaved result, if any. On a retryable failure the result stays on the entry.
async fn persist(state: &AppState, id: RunId) -> Result<(), WriteError> {
    let (result, who) = {
        let mut g = match state.runs.write() {
            Ok(guard) => guard,
            Err(_) => return Ok(()),
        };
        let Some(entry) = g.get_mut(&id) else {
            return Ok(());
        };
        match (&entry.unsaved, entry.saving) {
            (Some(result), false) => {
                entry.saving = true;
                (result.clone(), entry.participant.clone())
            }
            _ => return Ok(()),
        }
    };

    let outcome = submit_result(state.store.as_ref(), &result, &who, Utc::now()).await;

    if let Ok(mut g) = state.runs.write() {
        if let Some(entry) = g.get_mut(&id) {
            entry.saving = false;
            match &outcome {
                Ok(_) => entry.unsaved = None,
                Err(e) if !e.is_retryable() => {
                    log::error!("Dropping unstorable result of run {}: {}", id, e);
                    entry.unsaved = None;
                }
                Err(_) => {}
            }
        }
    }
    outcome.map(|_| ())
}

/// Persist if something is waiting, then answer with the run's current view.
async fn respond_after_persist(state: &AppState, id: RunId, who: &ParticipantId) -> HttpResponse {
    let save_error = persist(state, id).await.err().map(|e| e.to_string());
    with_run(state, id, who, |entry| {
        HttpResponse::Ok().json(run_response(entry, save_error))
    })
}

#[get("/api/health")]
async fn api_health() -> impl Responder {
    HttpResponse::Ok().json(HealthResponse {
        ok: true,
        service: "pick-one-tournament",
    })
}

/// Avoid 404 in browser tab: favicon not required for app logic.
#[get("/favicon.ico")]
async fn favicon() -> HttpResponse {
    HttpResponse::NoContent().finish()
}

/// List tournaments that can be played.
#[get("/api/tournaments")]
async fn api_list_tournaments(state: AppState) -> HttpResponse {
    let list: Vec<TournamentSummary> = state
        .catalog
        .iter()
        .map(|(id, pool)| TournamentSummary {
            id,
            candidates: pool.len(),
        })
        .collect();
    HttpResponse::Ok().json(list)
}

/// Start a run of a tournament (returns its view with id; client keeps the id).
#[post("/api/runs")]
async fn api_create_run(
    state: AppState,
    req: HttpRequest,
    session: Session,
    body: Json<CreateRunBody>,
) -> HttpResponse {
    let who = participant(&req, &session);
    let Some(pool) = state.catalog.get(&body.tournament_id) else {
        return HttpResponse::NotFound().json(error_json("No tournament"));
    };
    let run = match start_run(
        body.tournament_id.clone(),
        pool,
        body.sample_size,
        &mut rand::thread_rng(),
    ) {
        Ok(run) => run,
        Err(e) => return HttpResponse::BadRequest().json(error_json(e)),
    };
    let id = run.id();
    let mut g = match state.runs.write() {
        Ok(guard) => guard,
        Err(_) => return HttpResponse::InternalServerError().body("lock error"),
    };
    let entry = g.entry(id).or_insert(RunEntry {
        run,
        participant: who,
        unsaved: None,
        saving: false,
        last_activity: Instant::now(),
    });
    HttpResponse::Ok().json(run_response(entry, None))
}

/// Get a run by id (404 if not found or not yours). Touching it refreshes last_activity.
#[get("/api/runs/{id}")]
async fn api_get_run(
    state: AppState,
    req: HttpRequest,
    session: Session,
    path: Path<RunPath>,
) -> HttpResponse {
    let who = participant(&req, &session);
    with_run(&state, path.id, &who, |entry| {
        HttpResponse::Ok().json(run_response(entry, None))
    })
}

/// Pick the winner of the current match. Finishing the bracket stores the result.
#[post("/api/runs/{id}/pick")]
async fn api_pick(
    state: AppState,
    req: HttpRequest,
    session: Session,
    path: Path<RunPath>,
    body: Json<PickBody>,
) -> HttpResponse {
    let who = participant(&req, &session);
    let mut finished = false;
    let resp = with_run(&state, path.id, &who, |entry| {
        match pick(&mut entry.run, body.slot) {
            Ok(()) => {
                capture_result(entry);
                finished = entry.unsaved.is_some();
                HttpResponse::Ok().json(run_response(entry, None))
            }
            Err(e) => HttpResponse::BadRequest().json(error_json(e)),
        }
    });
    if finished {
        return respond_after_persist(&state, path.id, &who).await;
    }
    resp
}

/// Undo the last pick. A no-op when there is nothing to undo.
#[post("/api/runs/{id}/back")]
async fn api_back(
    state: AppState,
    req: HttpRequest,
    session: Session,
    path: Path<RunPath>,
) -> HttpResponse {
    let who = participant(&req, &session);
    with_run(&state, path.id, &who, |entry| {
        back(&mut entry.run);
        HttpResponse::Ok().json(run_response(entry, None))
    })
}

/// Confirm a resurrection selection (equal, non-zero counts on both sides).
#[post("/api/runs/{id}/resurrection/confirm")]
async fn api_resurrection_confirm(
    state: AppState,
    req: HttpRequest,
    session: Session,
    path: Path<RunPath>,
    body: Json<ResurrectionSelection>,
) -> HttpResponse {
    let who = participant(&req, &session);
    let mut finished = false;
    let resp = with_run(&state, path.id, &who, |entry| {
        match confirm_resurrection(&mut entry.run, &body) {
            Ok(()) => {
                capture_result(entry);
                finished = entry.unsaved.is_some();
                HttpResponse::Ok().json(run_response(entry, None))
            }
            Err(e) => HttpResponse::BadRequest().json(error_json(e)),
        }
    });
    if finished {
        return respond_after_persist(&state, path.id, &who).await;
    }
    resp
}

/// Decline the resurrection offer.
#[post("/api/runs/{id}/resurrection/skip")]
async fn api_resurrection_skip(
    state: AppState,
    req: HttpRequest,
    session: Session,
    path: Path<RunPath>,
) -> HttpResponse {
    let who = participant(&req, &session);
    with_run(&state, path.id, &who, |entry| {
        match skip_resurrection(&mut entry.run) {
            Ok(()) => HttpResponse::Ok().json(run_response(entry, None)),
            Err(e) => HttpResponse::BadRequest().json(error_json(e)),
        }
    })
}

/// Restart: a fresh bracket from the same tournament. Any unsaved result is abandoned.
#[post("/api/runs/{id}/restart")]
async fn api_restart_run(
    state: AppState,
    req: HttpRequest,
    session: Session,
    path: Path<RunPath>,
    body: Option<Json<RestartBody>>,
) -> HttpResponse {
    let who = participant(&req, &session);
    let sample_size = body.as_ref().and_then(|b| b.sample_size);
    let catalog = &state.catalog;
    with_run(&state, path.id, &who, |entry| {
        let Some(pool) = catalog.get(entry.run.tournament_id()) else {
            return HttpResponse::NotFound().json(error_json("No tournament"));
        };
        match restart_run(&mut entry.run, pool, sample_size, &mut rand::thread_rng()) {
            Ok(()) => {
                if entry.unsaved.take().is_some() {
                    log::warn!("Run {} restarted with an unsaved result; abandoning it", path.id);
                }
                HttpResponse::Ok().json(run_response(entry, None))
            }
            Err(e) => HttpResponse::BadRequest().json(error_json(e)),
        }
    })
}

/// Retry storing a finished run's result.
#[post("/api/runs/{id}/finalize")]
async fn api_finalize(
    state: AppState,
    req: HttpRequest,
    session: Session,
    path: Path<RunPath>,
) -> HttpResponse {
    let who = participant(&req, &session);
    if !owns_run(&state, path.id, &who) {
        return HttpResponse::NotFound().json(error_json("No run"));
    }
    let save_error = persist(&state, path.id).await.err();
    with_run(&state, path.id, &who, |entry| match &save_error {
        Some(e) if e.is_retryable() => HttpResponse::ServiceUnavailable()
            .json(run_response(entry, Some(e.to_string()))),
        _ => HttpResponse::Ok().json(run_response(entry, save_error.as_ref().map(|e| e.to_string()))),
    })
}

/// Rankings for a tournament. A store failure answers 503 with no rankings, never zeros.
#[get("/api/tournaments/{id}/rankings")]
async fn api_rankings(
    state: AppState,
    path: Path<TournamentPath>,
    query: Query<RankingsQuery>,
) -> HttpResponse {
    let view = if query.members_only {
        RankingView::MembersOnly
    } else {
        RankingView::Everyone
    };
    let stat_query = StatQuery::new(path.id.clone())
        .with_range(TimeRange {
            from: query.from,
            to: query.to,
        })
        .with_page_size(state.stats_page_size);

    let board = match leaderboard(state.store.as_ref(), &stat_query, view).await {
        Ok(board) => board,
        Err(e) => {
            log::warn!("Rankings for {} unavailable: {}", path.id, e);
            return HttpResponse::ServiceUnavailable()
                .json(serde_json::json!({ "error": e.to_string(), "rankings": null }));
        }
    };

    let pool = state.catalog.get(&path.id);
    let rows: Vec<RankingRow> = board
        .standings
        .iter()
        .enumerate()
        .map(|(i, s)| RankingRow {
            rank: i + 1,
            standing: s,
            name: pool
                .and_then(|p| p.get(&s.candidate_id))
                .map(|c| c.name.as_str()),
            win_rate: s.win_rate(),
            match_win_rate: s.match_win_rate(),
        })
        .collect();
    HttpResponse::Ok().json(serde_json::json!({
        "tournament_id": board.tournament_id,
        "view": board.view,
        "records_read": board.records_read,
        "rankings": rows,
    }))
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let config = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            log::error!("{}", e);
            return Err(std::io::Error::new(std::io::ErrorKind::InvalidInput, e.to_string()));
        }
    };

    let catalog = match PoolCatalog::load_dir(&config.pools_dir) {
        Ok(c) => c,
        Err(e) => {
            log::warn!("No pools loaded from {:?}: {}", config.pools_dir, e);
            PoolCatalog::new()
        }
    };
    log::info!("{} tournament pool(s) available", catalog.len());

    let store: Arc<dyn StatStore> = match &config.data_dir {
        Some(dir) => {
            log::info!("Storing stats under {:?}", dir);
            Arc::new(JsonlStatStore::new(dir.clone()))
        }
        None => {
            log::warn!("DATA_DIR not set: stats are kept in memory only");
            Arc::new(MemoryStatStore::new())
        }
    };

    let state = Data::new(Shared {
        runs: RwLock::new(HashMap::new()),
        catalog,
        store,
        stats_page_size: config.stats_page_size,
    });

    // Background task: every 30 minutes, retry unsaved results of idle runs, then remove
    // idle runs that hold nothing unsaved
    let state_cleanup = state.clone();
    let idle_timeout = config.run_idle_timeout;
    actix_web::rt::spawn(async move {
        let mut interval = actix_web::rt::time::interval(Duration::from_secs(30 * 60));
        loop {
            interval.tick().await;
            let pending: Vec<RunId> = match state_cleanup.runs.read() {
                Ok(g) => g
                    .iter()
                    .filter(|(_, e)| is_idle(e, idle_timeout) && e.unsaved.is_some())
                    .map(|(id, _)| *id)
                    .collect(),
                Err(_) => continue,
            };
            for id in pending {
                if let Err(e) = persist(&state_cleanup, id).await {
                    log::warn!("Idle run {} keeps its unsaved result: {}", id, e);
                }
            }

            let mut g = match state_cleanup.runs.write() {
                Ok(guard) => guard,
                Err(_) => continue,
            };
            let before = g.len();
            g.retain(|_, entry| !is_evictable(entry, idle_timeout));
            let removed = before - g.len();
            if removed > 0 {
                log::info!("Cleaned up {} idle run(s)", removed);
            }
        }
    });

    // Guest ids live in the session cookie; a fresh key per process starts new sessions.
    let session_key = Key::generate();

    let bind = (config.host.clone(), config.port);
    log::info!("Starting server at http://{}:{}", bind.0, bind.1);

    HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .wrap(
                SessionMiddleware::builder(CookieSessionStore::default(), session_key.clone())
                    .cookie_secure(false)
                    .build(),
            )
            .service(api_health)
            .service(favicon)
            .service(api_list_tournaments)
            .service(api_create_run)
            .service(api_get_run)
            .service(api_pick)
            .service(api_back)
            .service(api_resurrection_confirm)
            .service(api_resurrection_skip)
            .service(api_restart_run)
            .service(api_finalize)
            .service(api_rankings)
    })
    .bind(bind)?
    .run()
    .await
}
