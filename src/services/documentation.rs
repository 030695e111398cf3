use utoipa::OpenApi;

#[derive(OpenApi)]
/// Aggregated OpenAPI specification for Court Queue Back.
#[openapi(
    paths(
        crate::routes::health::healthcheck,
        crate::routes::members::register_member,
        crate::routes::members::member_profile,
        crate::routes::session::check_in,
        crate::routes::session::current_session,
        crate::routes::courts::list_courts,
        crate::routes::courts::list_reservations,
        crate::routes::courts::reserve_court,
        crate::routes::courts::cancel_reservation,
        crate::routes::courts::start_game,
        crate::routes::courts::end_game,
        crate::routes::feed::public_feed,
        crate::routes::feed::admin_feed,
        crate::routes::admin::get_settings,
        crate::routes::admin::update_settings,
        crate::routes::admin::list_active_sessions,
        crate::routes::admin::entry_link,
    ),
    components(
        schemas(
            crate::dto::health::HealthResponse,
            crate::dto::member::RegisterMemberRequest,
            crate::dto::member::MemberDto,
            crate::dto::member::MemberRegisteredResponse,
            crate::dto::member::MemberProfileResponse,
            crate::dto::session::CheckInRequest,
            crate::dto::session::SessionDto,
            crate::dto::reservation::ReserveRequest,
            crate::dto::reservation::ReservationStatusDto,
            crate::dto::reservation::ReservationDto,
            crate::dto::reservation::ReservationWithMemberDto,
            crate::dto::reservation::ReserveResponse,
            crate::dto::reservation::EndGameResponse,
            crate::dto::court::CourtStatusDto,
            crate::dto::court::TeamMemberDto,
            crate::dto::court::TeamOverview,
            crate::dto::court::CourtOverview,
            crate::dto::admin::SettingsDto,
            crate::dto::admin::UpdateSettingsRequest,
            crate::dto::admin::ActiveEntryDto,
            crate::dto::admin::EntryLinkDto,
            crate::dto::feed::Handshake,
            crate::dto::feed::SystemStatus,
            crate::dto::feed::ChangeEvent,
            crate::state::feed::FeedTable,
            crate::state::feed::FeedOp,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "members", description = "Member registration and profiles"),
        (name = "sessions", description = "Entry session check-in"),
        (name = "courts", description = "Court board and reservations"),
        (name = "feed", description = "Server-sent change feeds"),
        (name = "admin", description = "Venue administration"),
    )
)]
pub struct ApiDoc;
