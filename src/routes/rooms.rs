use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::{get, post, put},
};
use axum_valid::Valid;

use crate::{
    dto::room::{
        AddAiRequest, CodeWordsRequest, CreateRoomRequest, JoinRoomRequest, NameResponse,
        RoomSnapshot, StartRoomRequest, SubmitCluesRequest, SubmitGuessRequest, TeamDto,
        ViewerQuery,
    },
    error::{AppError, ServiceError},
    services::room_service,
    state::SharedState,
};

/// Routes driving rooms from creation to the final score.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/rooms", post(create_room))
        .route("/rooms/{code}", get(get_room))
        .route("/rooms/{code}/participants", post(join_room))
        .route("/rooms/{code}/ai", post(add_ai))
        .route("/rooms/{code}/teams/{team}/words", put(set_code_words))
        .route("/rooms/{code}/start", post(start_room))
        .route("/rooms/{code}/clues", post(submit_clues))
        .route("/rooms/{code}/guess", put(update_guess))
        .route("/rooms/{code}/guesses", post(submit_guess))
        .route("/names/random", get(random_name))
}

/// Open a new room.
#[utoipa::path(
    post,
    path = "/rooms",
    tag = "rooms",
    request_body = CreateRoomRequest,
    responses(
        (status = 200, description = "Room created", body = RoomSnapshot),
        (status = 400, description = "Invalid request")
    )
)]
pub async fn create_room(
    State(state): State<SharedState>,
    Valid(Json(payload)): Valid<Json<CreateRoomRequest>>,
) -> Result<Json<RoomSnapshot>, AppError> {
    let snapshot = room_service::create_room(&state, payload).await?;
    Ok(Json(snapshot))
}

/// Fetch a room as seen by an optional viewer.
#[utoipa::path(
    get,
    path = "/rooms/{code}",
    tag = "rooms",
    params(("code" = String, Path, description = "Room code"), ViewerQuery),
    responses(
        (status = 200, description = "Current room state", body = RoomSnapshot),
        (status = 404, description = "Unknown room")
    )
)]
pub async fn get_room(
    State(state): State<SharedState>,
    Path(code): Path<String>,
    Query(query): Query<ViewerQuery>,
) -> Result<Json<RoomSnapshot>, AppError> {
    let snapshot = room_service::get_room(&state, &code, query.viewer.as_deref()).await?;
    Ok(Json(snapshot))
}

/// Join a room during setup.
#[utoipa::path(
    post,
    path = "/rooms/{code}/participants",
    tag = "rooms",
    params(("code" = String, Path, description = "Room code")),
    request_body = JoinRoomRequest,
    responses(
        (status = 200, description = "Joined; the room as seen by the new participant", body = RoomSnapshot),
        (status = 400, description = "Name taken or team missing"),
        (status = 404, description = "Unknown room"),
        (status = 409, description = "The game already started")
    )
)]
pub async fn join_room(
    State(state): State<SharedState>,
    Path(code): Path<String>,
    Valid(Json(payload)): Valid<Json<JoinRoomRequest>>,
) -> Result<Json<RoomSnapshot>, AppError> {
    let snapshot =
        room_service::join_room(&state, &code, &payload.name, payload.team.map(Into::into))
            .await?;
    Ok(Json(snapshot))
}

/// Seat an AI participant during setup.
#[utoipa::path(
    post,
    path = "/rooms/{code}/ai",
    tag = "rooms",
    params(("code" = String, Path, description = "Room code"), ViewerQuery),
    request_body = AddAiRequest,
    responses(
        (status = 200, description = "AI participant added", body = RoomSnapshot),
        (status = 404, description = "Unknown room"),
        (status = 409, description = "The game already started")
    )
)]
pub async fn add_ai(
    State(state): State<SharedState>,
    Path(code): Path<String>,
    Query(query): Query<ViewerQuery>,
    Valid(Json(payload)): Valid<Json<AddAiRequest>>,
) -> Result<Json<RoomSnapshot>, AppError> {
    let snapshot =
        room_service::add_ai(&state, &code, payload, query.viewer.as_deref()).await?;
    Ok(Json(snapshot))
}

/// Set or draw a team's code words.
#[utoipa::path(
    put,
    path = "/rooms/{code}/teams/{team}/words",
    tag = "rooms",
    params(
        ("code" = String, Path, description = "Room code"),
        ("team" = TeamDto, Path, description = "Team owning the words"),
        ViewerQuery
    ),
    request_body = CodeWordsRequest,
    responses(
        (status = 200, description = "Code words stored", body = RoomSnapshot),
        (status = 400, description = "Invalid words"),
        (status = 404, description = "Unknown room"),
        (status = 409, description = "The game already started")
    )
)]
pub async fn set_code_words(
    State(state): State<SharedState>,
    Path((code, team)): Path<(String, TeamDto)>,
    Query(query): Query<ViewerQuery>,
    Valid(Json(payload)): Valid<Json<CodeWordsRequest>>,
) -> Result<Json<RoomSnapshot>, AppError> {
    let snapshot = room_service::set_code_words(
        &state,
        &code,
        team.into(),
        payload.words,
        query.viewer.as_deref(),
    )
    .await?;
    Ok(Json(snapshot))
}

/// Leave setup and open the first round.
#[utoipa::path(
    post,
    path = "/rooms/{code}/start",
    tag = "rooms",
    params(("code" = String, Path, description = "Room code"), ViewerQuery),
    request_body = StartRoomRequest,
    responses(
        (status = 200, description = "Game started", body = RoomSnapshot),
        (status = 400, description = "Invalid start options"),
        (status = 404, description = "Unknown room"),
        (status = 409, description = "Already started or not enough participants")
    )
)]
pub async fn start_room(
    State(state): State<SharedState>,
    Path(code): Path<String>,
    Query(query): Query<ViewerQuery>,
    Valid(Json(payload)): Valid<Json<StartRoomRequest>>,
) -> Result<Json<RoomSnapshot>, AppError> {
    let snapshot =
        room_service::start_room(&state, &code, payload, query.viewer.as_deref()).await?;
    Ok(Json(snapshot))
}

/// Submit clues for the open round.
#[utoipa::path(
    post,
    path = "/rooms/{code}/clues",
    tag = "rooms",
    params(("code" = String, Path, description = "Room code")),
    request_body = SubmitCluesRequest,
    responses(
        (status = 200, description = "Clues recorded", body = RoomSnapshot),
        (status = 400, description = "Invalid clues"),
        (status = 403, description = "Not this participant's turn"),
        (status = 404, description = "Unknown room"),
        (status = 409, description = "Wrong phase or turn, or clues already written")
    )
)]
pub async fn submit_clues(
    State(state): State<SharedState>,
    Path(code): Path<String>,
    Valid(Json(payload)): Valid<Json<SubmitCluesRequest>>,
) -> Result<Json<RoomSnapshot>, AppError> {
    let snapshot =
        room_service::submit_clues(&state, &code, &payload.name, payload.turn, payload.clues)
            .await?;
    Ok(Json(snapshot))
}

/// Move a pending scale guess without submitting it.
#[utoipa::path(
    put,
    path = "/rooms/{code}/guess",
    tag = "rooms",
    params(("code" = String, Path, description = "Room code")),
    request_body = SubmitGuessRequest,
    responses(
        (status = 200, description = "Pending guess stored", body = RoomSnapshot),
        (status = 400, description = "Invalid guess"),
        (status = 403, description = "The clue-giver does not guess"),
        (status = 404, description = "Unknown room"),
        (status = 409, description = "Wrong phase or turn, or guess already submitted")
    )
)]
pub async fn update_guess(
    State(state): State<SharedState>,
    Path(code): Path<String>,
    Valid(Json(payload)): Valid<Json<SubmitGuessRequest>>,
) -> Result<Json<RoomSnapshot>, AppError> {
    let guess = payload.guess.into_guess().map_err(ServiceError::from)?;
    let snapshot =
        room_service::update_guess(&state, &code, &payload.name, payload.turn, guess).await?;
    Ok(Json(snapshot))
}

/// Submit a final guess.
#[utoipa::path(
    post,
    path = "/rooms/{code}/guesses",
    tag = "rooms",
    params(("code" = String, Path, description = "Room code")),
    request_body = SubmitGuessRequest,
    responses(
        (status = 200, description = "Guess recorded", body = RoomSnapshot),
        (status = 400, description = "Invalid guess"),
        (status = 403, description = "The clue-giver does not guess"),
        (status = 404, description = "Unknown room"),
        (status = 409, description = "Wrong phase or turn, or guess already submitted")
    )
)]
pub async fn submit_guess(
    State(state): State<SharedState>,
    Path(code): Path<String>,
    Valid(Json(payload)): Valid<Json<SubmitGuessRequest>>,
) -> Result<Json<RoomSnapshot>, AppError> {
    let guess = payload.guess.into_guess().map_err(ServiceError::from)?;
    let snapshot =
        room_service::submit_guess(&state, &code, &payload.name, payload.turn, guess).await?;
    Ok(Json(snapshot))
}

/// Suggest a random display name.
#[utoipa::path(
    get,
    path = "/names/random",
    tag = "rooms",
    responses((status = 200, description = "Random name", body = NameResponse))
)]
pub async fn random_name(State(state): State<SharedState>) -> Json<NameResponse> {
    Json(room_service::random_player_name(&state))
}
