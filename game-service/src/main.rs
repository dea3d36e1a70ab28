// Copyright (C) 2026 StarHuntingGames
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

use std::{collections::HashMap, net::SocketAddr, sync::Arc};

use anyhow::Context;
use async_trait::async_trait;
use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use chrono::{DateTime, Utc};
use mastermind_common::{Code, GameResponse, GameStatus, GuessResult, MAX_TURNS};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use uuid::Uuid;

#[derive(Clone)]
struct AppState {
    store: Arc<RwLock<InMemoryStore>>,
    code_generator: Arc<dyn CodeGenerator>,
    code_checker: Arc<dyn CodeChecker>,
    tournament_notifier: Arc<dyn TournamentNotifier>,
    game_locks: Arc<tokio::sync::Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>>,
}

#[derive(Default)]
struct InMemoryStore {
    games: HashMap<String, Game>,
}

impl AppState {
    fn from_env() -> Self {
        Self {
            store: Arc::new(RwLock::new(InMemoryStore::default())),
            code_generator: Arc::new(RemoteCodeGenerator::from_env()),
            code_checker: Arc::new(RemoteCodeChecker::from_env()),
            tournament_notifier: Arc::new(RemoteTournamentNotifier::from_env()),
            game_locks: Arc::new(tokio::sync::Mutex::new(HashMap::new())),
        }
    }

    /// One mutex per game id, so concurrent guesses against the same game
    /// serialize while unrelated games stay independent.
    async fn game_lock(&self, game_id: &str) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self.game_locks.lock().await;
        locks
            .entry(game_id.to_string())
            .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(())))
            .clone()
    }
}

#[derive(Debug)]
enum GameError {
    GameNotFound(String),
    GameInProgress,
    GameFinished,
    Checker(anyhow::Error),
}

#[derive(Debug, Clone, Copy)]
struct Turn {
    #[allow(dead_code)]
    guess: Code,
    result: GuessResult,
}

impl Turn {
    fn is_winning_turn(&self) -> bool {
        self.result.is_winning()
    }
}

/// A single running or finished game. All state transitions go through
/// `guess`; the win/loss decision lives here and nowhere else.
#[derive(Debug, Clone)]
struct Game {
    id: String,
    secret: Code,
    turns: Vec<Turn>,
    status: GameStatus,
    created_at: DateTime<Utc>,
}

impl Game {
    fn new(secret: Code) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            secret,
            turns: Vec::new(),
            status: GameStatus::InProgress,
            created_at: Utc::now(),
        }
    }

    fn is_finished(&self) -> bool {
        self.status.is_terminal()
    }

    fn turns_played(&self) -> usize {
        self.turns.len()
    }

    /// Check a guess, record the turn and update the status. The win check
    /// runs before the turn-limit check, so a correct guess on the last
    /// allowed turn still wins.
    async fn guess(
        &mut self,
        guess: Code,
        checker: &dyn CodeChecker,
    ) -> Result<GuessResult, GameError> {
        if self.is_finished() {
            return Err(GameError::GameFinished);
        }

        let result = checker
            .check_code(&self.secret, &guess)
            .await
            .map_err(GameError::Checker)?;

        let turn = Turn { guess, result };
        let won = turn.is_winning_turn();
        self.turns.push(turn);
        if won {
            self.status = GameStatus::Won;
        } else if self.turns.len() >= MAX_TURNS {
            self.status = GameStatus::Lost;
        }

        Ok(result)
    }

    fn solution(&self) -> Result<Code, GameError> {
        if !self.is_finished() {
            return Err(GameError::GameInProgress);
        }
        Ok(self.secret)
    }
}

#[async_trait]
trait CodeGenerator: Send + Sync {
    async fn generate_code(&self) -> anyhow::Result<Code>;
}

#[async_trait]
trait CodeChecker: Send + Sync {
    async fn check_code(&self, secret: &Code, guess: &Code) -> anyhow::Result<GuessResult>;
}

#[async_trait]
trait TournamentNotifier: Send + Sync {
    async fn game_ended(
        &self,
        game_id: &str,
        status: GameStatus,
        guesses: usize,
    ) -> anyhow::Result<()>;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct CheckCodeRequest {
    actual: Code,
    guess: Code,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GameEndedRequest {
    game_id: String,
    result: GameStatus,
    guesses: usize,
}

#[derive(Clone)]
struct RemoteCodeGenerator {
    client: reqwest::Client,
    base_url: String,
}

impl RemoteCodeGenerator {
    fn from_env() -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: std::env::var("GENERATOR_URL")
                .ok()
                .unwrap_or_else(|| "http://localhost:8081".to_string()),
        }
    }
}

#[async_trait]
impl CodeGenerator for RemoteCodeGenerator {
    async fn generate_code(&self) -> anyhow::Result<Code> {
        let url = format!("{}/generate", self.base_url.trim_end_matches('/'));
        let response = self
            .client
            .get(url)
            .send()
            .await
            .context("failed to call code generator")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_else(|_| "".to_string());
            anyhow::bail!("generator returned {status}: {body}");
        }

        response
            .json::<Code>()
            .await
            .context("invalid generator response")
    }
}

#[derive(Clone)]
struct RemoteCodeChecker {
    client: reqwest::Client,
    base_url: String,
}

impl RemoteCodeChecker {
    fn from_env() -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: std::env::var("CHECKER_URL")
                .ok()
                .unwrap_or_else(|| "http://localhost:8082".to_string()),
        }
    }
}

#[async_trait]
impl CodeChecker for RemoteCodeChecker {
    async fn check_code(&self, secret: &Code, guess: &Code) -> anyhow::Result<GuessResult> {
        let url = format!("{}/check", self.base_url.trim_end_matches('/'));
        let response = self
            .client
            .post(url)
            .json(&CheckCodeRequest {
                actual: *secret,
                guess: *guess,
            })
            .send()
            .await
            .context("failed to call code checker")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_else(|_| "".to_string());
            anyhow::bail!("checker returned {status}: {body}");
        }

        response
            .json::<GuessResult>()
            .await
            .context("invalid checker response")
    }
}

#[derive(Clone)]
struct RemoteTournamentNotifier {
    client: reqwest::Client,
    base_url: String,
}

impl RemoteTournamentNotifier {
    fn from_env() -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: std::env::var("TOURNAMENT_SVC_URL")
                .ok()
                .unwrap_or_else(|| "http://localhost:8083".to_string()),
        }
    }
}

#[async_trait]
impl TournamentNotifier for RemoteTournamentNotifier {
    async fn game_ended(
        &self,
        game_id: &str,
        status: GameStatus,
        guesses: usize,
    ) -> anyhow::Result<()> {
        let url = format!(
            "{}/games/{}/result",
            self.base_url.trim_end_matches('/'),
            game_id
        );
        let response = self
            .client
            .put(url)
            .json(&GameEndedRequest {
                game_id: game_id.to_string(),
                result: status,
                guesses,
            })
            .send()
            .await
            .context("failed to call tournament service")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_else(|_| "".to_string());
            anyhow::bail!("tournament service returned {status}: {body}");
        }

        Ok(())
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            std::env::var("RUST_LOG")
                .unwrap_or_else(|_| "game_service=debug,tower_http=info".to_string()),
        )
        .init();

    let state = AppState::from_env();
    let app = build_router(state);

    let bind_addr = parse_bind_addr("GAME_SERVICE_BIND", "0.0.0.0:8080")?;
    info!(%bind_addr, "game-service listening");
    let listener = tokio::net::TcpListener::bind(bind_addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/games", post(create_game_handler).get(list_games_handler))
        .route("/games/{game_id}", get(get_game_handler))
        .route("/games/{game_id}/guess", post(guess_code_handler))
        .route("/games/{game_id}/solution", get(get_solution_handler))
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

fn parse_bind_addr(var_name: &str, default: &str) -> anyhow::Result<SocketAddr> {
    let value = std::env::var(var_name)
        .ok()
        .unwrap_or_else(|| default.to_string());
    value.parse().context(format!("invalid {var_name}"))
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({"ok": true, "service": "game-service"}))
}

async fn create_game_handler(
    State(state): State<AppState>,
) -> Result<Json<GameResponse>, ApiError> {
    let secret = state
        .code_generator
        .generate_code()
        .await
        .map_err(|error| ApiError::bad_gateway(format!("generator request failed: {error:#}")))?;

    let game = Game::new(secret);
    info!(game_id = %game.id, created_at = %game.created_at, "started new game");
    let response = GameResponse {
        id: game.id.clone(),
        status: game.status,
    };

    {
        let mut store = state.store.write().await;
        store.games.insert(game.id.clone(), game);
    }

    Ok(Json(response))
}

async fn list_games_handler(State(state): State<AppState>) -> Json<Vec<GameResponse>> {
    let store = state.store.read().await;
    let games = store
        .games
        .values()
        .map(|game| GameResponse {
            id: game.id.clone(),
            status: game.status,
        })
        .collect();
    Json(games)
}

async fn get_game_handler(
    State(state): State<AppState>,
    Path(game_id): Path<String>,
) -> Result<Json<GameResponse>, ApiError> {
    let store = state.store.read().await;
    let game = store
        .games
        .get(&game_id)
        .ok_or_else(|| ApiError::not_found(format!("game {} not found", game_id)))?;

    Ok(Json(GameResponse {
        id: game.id.clone(),
        status: game.status,
    }))
}

async fn guess_code_handler(
    State(state): State<AppState>,
    Path(game_id): Path<String>,
    Json(guess): Json<Code>,
) -> Result<Json<GuessResult>, ApiError> {
    let lock = state.game_lock(&game_id).await;
    let _guard = lock.lock().await;

    let mut game = {
        let store = state.store.read().await;
        store
            .games
            .get(&game_id)
            .cloned()
            .ok_or_else(|| GameError::GameNotFound(game_id.clone()))?
    };

    let result = game.guess(guess, state.code_checker.as_ref()).await?;
    let status = game.status;
    let turns_played = game.turns_played();

    {
        let mut store = state.store.write().await;
        store.games.insert(game_id.clone(), game);
    }

    info!(
        game_id = %game_id,
        black_pins = result.black_pins,
        white_pins = result.white_pins,
        status = ?status,
        "guess checked"
    );

    if status.is_terminal() {
        state
            .tournament_notifier
            .game_ended(&game_id, status, turns_played)
            .await
            .map_err(|error| {
                ApiError::bad_gateway(format!("tournament notification failed: {error:#}"))
            })?;
        info!(game_id = %game_id, status = ?status, turns_played, "game ended, tournament notified");
    }

    Ok(Json(result))
}

async fn get_solution_handler(
    State(state): State<AppState>,
    Path(game_id): Path<String>,
) -> Result<Json<Code>, ApiError> {
    let store = state.store.read().await;
    let game = store
        .games
        .get(&game_id)
        .ok_or_else(|| GameError::GameNotFound(game_id.clone()))?;

    Ok(Json(game.solution()?))
}

#[derive(Debug)]
struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }

    fn not_found(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            message: message.into(),
        }
    }

    fn bad_gateway(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_GATEWAY,
            message: message.into(),
        }
    }
}

impl From<GameError> for ApiError {
    fn from(error: GameError) -> Self {
        match error {
            GameError::GameNotFound(game_id) => {
                ApiError::bad_request(format!("game {game_id} does not exist"))
            }
            GameError::GameInProgress => {
                ApiError::bad_request("the game is still in progress, the code stays secret")
            }
            GameError::GameFinished => {
                ApiError::bad_request("no more guessing, the game is already finished")
            }
            GameError::Checker(error) => {
                ApiError::bad_gateway(format!("checker request failed: {error:#}"))
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        warn!(status = %self.status, message = %self.message, "request failed");
        (
            self.status,
            Json(serde_json::json!({
                "statusCode": self.status.as_u16(),
                "message": self.message
            })),
        )
            .into_response()
    }
}
