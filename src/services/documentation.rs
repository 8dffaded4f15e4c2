use utoipa::OpenApi;

#[derive(OpenApi)]
/// Aggregated OpenAPI specification for Waivelength Back.
#[openapi(
    paths(
        crate::routes::health::healthcheck,
        crate::routes::sse::room_stream,
        crate::routes::rooms::create_room,
        crate::routes::rooms::get_room,
        crate::routes::rooms::join_room,
        crate::routes::rooms::add_ai,
        crate::routes::rooms::set_code_words,
        crate::routes::rooms::start_room,
        crate::routes::rooms::submit_clues,
        crate::routes::rooms::update_guess,
        crate::routes::rooms::submit_guess,
        crate::routes::rooms::random_name,
    ),
    components(
        schemas(
            crate::dto::health::HealthResponse,
            crate::dto::room::VariantDto,
            crate::dto::room::TeamDto,
            crate::dto::room::GuessValue,
            crate::dto::room::CreateRoomRequest,
            crate::dto::room::JoinRoomRequest,
            crate::dto::room::AddAiRequest,
            crate::dto::room::CodeWordsRequest,
            crate::dto::room::StartRoomRequest,
            crate::dto::room::SubmitCluesRequest,
            crate::dto::room::SubmitGuessRequest,
            crate::dto::room::NameResponse,
            crate::dto::room::RoomSnapshot,
            crate::dto::sse::RoomUpdatedEvent,
        )
    ),
    tags(
        (name = "rooms", description = "Room lifecycle, clues and guesses"),
        (name = "sse", description = "Server-sent events streams"),
        (name = "health", description = "Health check endpoints"),
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn documents_every_room_route() {
        let doc = ApiDoc::openapi();
        let paths = doc.paths.paths.keys().cloned().collect::<Vec<_>>();
        for path in [
            "/rooms",
            "/rooms/{code}",
            "/rooms/{code}/participants",
            "/rooms/{code}/ai",
            "/rooms/{code}/teams/{team}/words",
            "/rooms/{code}/start",
            "/rooms/{code}/clues",
            "/rooms/{code}/guess",
            "/rooms/{code}/guesses",
            "/rooms/{code}/events",
            "/names/random",
            "/healthcheck",
        ] {
            assert!(paths.iter().any(|known| known == path), "missing {path}");
        }
    }
}
