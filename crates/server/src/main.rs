//! Mintboard — top-100 minter leaderboard service
//!
//! Usage:
//!   mintboard serve --port 3001 --owner minter-svc   — Launch the HTTP API
//!   mintboard simulate --participants 250            — Random traffic, print the board

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::Json,
    routing::{get, post},
    Router,
};
use chrono::Utc;
use clap::{Parser, Subcommand};
use engine::{GatedRanking, RankingError, SubmitOutcome, CAPACITY};
use serde::Deserialize;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

const APP_VERSION: &str = concat!(env!("CARGO_PKG_VERSION"), "-", env!("GIT_HASH"));

#[derive(Parser)]
#[command(name = "mintboard")]
#[command(about = "Top-100 minter leaderboard service", long_about = None)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Launch the leaderboard web server
    Serve {
        /// Host to bind to
        #[arg(long, default_value = "0.0.0.0")]
        host: String,
        /// Port to listen on
        #[arg(short, long, default_value_t = 3001)]
        port: u16,
        /// Identity of the authorized writer (falls back to MINTBOARD_OWNER)
        #[arg(long)]
        owner: Option<String>,
    },
    /// Feed random submissions into a fresh store and print the board
    Simulate {
        /// Number of distinct participants generating activity
        #[arg(long, default_value_t = 250)]
        participants: u32,
        /// Number of submissions to generate
        #[arg(long, default_value_t = 5000)]
        rounds: u32,
        /// Number of top entries to print
        #[arg(long, default_value_t = 20)]
        top_n: usize,
    },
}

#[derive(Clone)]
struct AppState {
    board: Arc<RwLock<GatedRanking>>,
}

fn init_logging(verbose: bool) {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = if verbose {
        EnvFilter::new("debug,engine=debug,mintboard=debug")
    } else {
        EnvFilter::new("info,engine=info,mintboard=info")
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).compact())
        .with(filter)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    dotenvy::dotenv().ok();

    match cli.command {
        Commands::Serve { host, port, owner } => {
            cmd_serve(&host, port, owner).await?;
        }
        Commands::Simulate {
            participants,
            rounds,
            top_n,
        } => {
            cmd_simulate(participants, rounds, top_n)?;
        }
    }

    Ok(())
}

// ============================================================================
// Serve command — Axum web server
// ============================================================================

async fn cmd_serve(host: &str, port: u16, owner: Option<String>) -> anyhow::Result<()> {
    info!("Mintboard v{} starting...", APP_VERSION);

    let owner = owner
        .or_else(|| std::env::var("MINTBOARD_OWNER").ok())
        .ok_or_else(|| anyhow::anyhow!("no writer identity: pass --owner or set MINTBOARD_OWNER"))?;

    let board = GatedRanking::new(owner.clone())
        .map_err(|e| anyhow::anyhow!("invalid owner identity: {}", e))?;
    info!("Leaderboard initialized, writer = {}", owner);

    let state = AppState {
        board: Arc::new(RwLock::new(board)),
    };

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api_routes = Router::new()
        .route("/health", get(api_health))
        .route("/leaderboard", get(api_leaderboard))
        .route("/rank/:participant", get(api_rank))
        .route("/stats", get(api_stats))
        .route("/submit", post(api_submit))
        .route("/owner/propose", post(api_propose_owner))
        .route("/owner/accept", post(api_accept_owner))
        .with_state(state);

    let app = Router::new().nest("/api", api_routes).layer(cors);

    let addr: std::net::SocketAddr = format!("{}:{}", host, port).parse()?;
    println!("\n=== Mintboard v{} ===", APP_VERSION);
    println!("Minter Leaderboard Server");
    println!("Listening on http://{}", addr);
    println!("\nEndpoints:");
    println!("  GET  /api/health             - Health check");
    println!("  GET  /api/leaderboard        - Top entries (?limit=N, default {})", CAPACITY);
    println!("  GET  /api/rank/:participant  - Rank and score of one participant");
    println!("  GET  /api/stats              - Occupancy and admission floor");
    println!("  POST /api/submit             - Record activity (x-caller header)");
    println!("  POST /api/owner/propose      - Propose a new writer identity");
    println!("  POST /api/owner/accept       - Accept a proposed handoff");
    println!("\nPress Ctrl+C to stop\n");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

// ============================================================================
// API Handlers — Reads (public)
// ============================================================================

/// GET /api/health
async fn api_health() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "service": "mintboard",
        "version": APP_VERSION,
    }))
}

/// GET /api/leaderboard — top entries in rank order
async fn api_leaderboard(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> (StatusCode, Json<serde_json::Value>) {
    let limit: usize = params
        .get("limit")
        .and_then(|s| s.parse().ok())
        .unwrap_or(CAPACITY);

    let board = state.board.read().unwrap();
    match board.store().top(limit) {
        Ok(entries) => (
            StatusCode::OK,
            Json(serde_json::json!({
                "success": true,
                "count": entries.len(),
                "entries": entries,
            })),
        ),
        Err(e) => (
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({
                "success": false,
                "error": e.to_string(),
            })),
        ),
    }
}

/// GET /api/rank/:participant — never an error for unknown participants
async fn api_rank(
    State(state): State<AppState>,
    Path(participant): Path<String>,
) -> Json<serde_json::Value> {
    let board = state.board.read().unwrap();
    match board.store().entry_for(&participant) {
        Some((entry, rank)) => Json(serde_json::json!({
            "success": true,
            "ranked": true,
            "rank": rank,
            "entry": entry,
        })),
        None => Json(serde_json::json!({
            "success": true,
            "ranked": false,
            "message": "not yet ranked",
        })),
    }
}

/// GET /api/stats — occupancy and admission floor
async fn api_stats(State(state): State<AppState>) -> Json<serde_json::Value> {
    let stats = state.board.read().unwrap().store().stats();
    Json(serde_json::json!({
        "success": true,
        "count": stats.count,
        "min_score": stats.min_score,
        "capacity": CAPACITY,
    }))
}

// ============================================================================
// API Handlers — Writes (gated by x-caller)
// ============================================================================

#[derive(Deserialize)]
struct SubmitRequest {
    participant: String,
    score: u64,
}

#[derive(Deserialize)]
struct ProposeRequest {
    candidate: String,
}

fn caller_identity(headers: &HeaderMap) -> String {
    headers
        .get("x-caller")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string()
}

fn error_response(e: RankingError) -> (StatusCode, Json<serde_json::Value>) {
    let status = match e {
        RankingError::Unauthorized => StatusCode::FORBIDDEN,
        _ => StatusCode::BAD_REQUEST,
    };
    (
        status,
        Json(serde_json::json!({
            "success": false,
            "error": e.to_string(),
        })),
    )
}

/// POST /api/submit — minting-workflow entry point
async fn api_submit(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<SubmitRequest>,
) -> (StatusCode, Json<serde_json::Value>) {
    let caller = caller_identity(&headers);
    let now = Utc::now().timestamp();

    let mut board = state.board.write().unwrap();
    match board.submit(&caller, &request.participant, request.score, now) {
        Ok(outcome) => {
            if let SubmitOutcome::Updated { rank, score, .. } = &outcome {
                info!(participant = %request.participant, rank, score, "leaderboard updated");
            }
            (
                StatusCode::OK,
                Json(serde_json::json!({
                    "success": true,
                    "result": outcome,
                })),
            )
        }
        Err(e) => error_response(e),
    }
}

/// POST /api/owner/propose — first half of the writer handoff
async fn api_propose_owner(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<ProposeRequest>,
) -> (StatusCode, Json<serde_json::Value>) {
    let caller = caller_identity(&headers);
    let mut board = state.board.write().unwrap();
    match board.propose_owner(&caller, &request.candidate) {
        Ok(()) => (
            StatusCode::OK,
            Json(serde_json::json!({
                "success": true,
                "pending_owner": request.candidate,
            })),
        ),
        Err(e) => error_response(e),
    }
}

/// POST /api/owner/accept — second half of the writer handoff
async fn api_accept_owner(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> (StatusCode, Json<serde_json::Value>) {
    let caller = caller_identity(&headers);
    let mut board = state.board.write().unwrap();
    match board.accept_ownership(&caller) {
        Ok(()) => (
            StatusCode::OK,
            Json(serde_json::json!({
                "success": true,
                "owner": board.owner(),
            })),
        ),
        Err(e) => error_response(e),
    }
}

// ============================================================================
// Simulate command — CLI mode (no web server)
// ============================================================================

fn cmd_simulate(participants: u32, rounds: u32, top_n: usize) -> anyhow::Result<()> {
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    println!("\n=== Mintboard v{} ===", APP_VERSION);
    println!("Simulating {} submissions across {} participants\n", rounds, participants);

    let owner = "simulator";
    let mut board =
        GatedRanking::new(owner).map_err(|e| anyhow::anyhow!("init failed: {}", e))?;

    // Running per-participant mint totals, so scores stay monotonic the way
    // the minting workflow produces them
    let mut totals: HashMap<u32, u64> = HashMap::new();
    let mut rng = StdRng::from_entropy();
    let mut updated = 0u32;
    let mut unchanged = 0u32;
    let mut not_admitted = 0u32;

    for _ in 0..rounds {
        let who = rng.gen_range(0..participants);
        let total = totals.entry(who).or_insert(0);
        *total += rng.gen_range(1..5u64);
        let participant = format!("minter-{:04}", who);
        match board.submit(owner, &participant, *total, Utc::now().timestamp()) {
            Ok(SubmitOutcome::Updated { .. }) => updated += 1,
            Ok(SubmitOutcome::Unchanged) => unchanged += 1,
            Ok(SubmitOutcome::NotAdmitted) => not_admitted += 1,
            Err(e) => anyhow::bail!("simulation submit failed: {}", e),
        }
    }

    let stats = board.store().stats();
    println!(
        "Outcomes: {} updated | {} unchanged | {} not admitted",
        updated, unchanged, not_admitted
    );
    println!(
        "Occupancy: {}/{} | admission floor: {}\n",
        stats.count, CAPACITY, stats.min_score
    );

    let top = board
        .store()
        .top(top_n.clamp(1, CAPACITY))
        .map_err(|e| anyhow::anyhow!("top query failed: {}", e))?;
    println!("Top {} Minters:", top.len());
    println!("  {:>4}  {:<14} {:>8}", "#", "Participant", "Score");
    println!("  {}", "-".repeat(30));
    for (i, e) in top.iter().enumerate() {
        println!("  {:>4}  {:<14} {:>8}", i + 1, e.participant, e.score);
    }

    Ok(())
}
