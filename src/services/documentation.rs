use utoipa::OpenApi;

#[derive(OpenApi)]
/// Aggregated OpenAPI specification for Rostrum.
#[openapi(
    paths(
        crate::routes::health::healthcheck,
        crate::routes::rooms::list_rooms,
        crate::routes::rooms::get_room,
        crate::routes::rooms::propose_topic,
        crate::routes::rooms::vote_topic,
        crate::routes::rooms::get_topic,
        crate::routes::rooms::remove_topic,
        crate::routes::rooms::set_stance,
        crate::routes::rooms::add_debater,
        crate::routes::rooms::vote_debater,
        crate::routes::rooms::vote_conclude,
        crate::routes::rooms::make_private,
        crate::routes::rooms::make_public,
        crate::routes::rooms::unlock,
        crate::routes::rooms::start_studio,
        crate::routes::rooms::stop_studio,
        crate::routes::rooms::consent,
        crate::routes::events::voice,
        crate::routes::events::message,
        crate::routes::events::member_joined,
        crate::routes::members::skill,
        crate::routes::members::compare,
        crate::routes::members::repair,
        crate::routes::members::random_proposition,
        crate::routes::admin::enable,
        crate::routes::admin::lockdown,
        crate::routes::gateway::ws_handler,
    ),
    components(
        schemas(
            crate::dto::health::HealthResponse,
            crate::dto::admin::ActionResponse,
            crate::dto::admin::EnableResponse,
            crate::dto::commands::ProposeTopicRequest,
            crate::dto::commands::ProposeTopicResponse,
            crate::dto::commands::ProposalResult,
            crate::dto::commands::VoteTopicRequest,
            crate::dto::commands::StanceRequest,
            crate::dto::commands::StanceResponse,
            crate::dto::commands::StanceResult,
            crate::dto::commands::MemberRequest,
            crate::dto::commands::StudioStartRequest,
            crate::dto::commands::Rubric,
            crate::dto::commands::VoteDebaterRequest,
            crate::dto::commands::ConcludeRequest,
            crate::dto::commands::ConcludeResponse,
            crate::dto::rooms::RoomView,
            crate::dto::rooms::MatchView,
            crate::dto::rooms::ParticipantView,
            crate::dto::rooms::TopicView,
            crate::dto::events::VoiceEvent,
            crate::dto::events::MessageEvent,
            crate::dto::events::MemberJoinedEvent,
            crate::dto::skill::SkillView,
            crate::dto::skill::CompareRequest,
            crate::dto::skill::ComparisonView,
            crate::dto::skill::PropositionView,
            crate::dto::gateway::GatewayRequest,
            crate::dto::gateway::GatewayCommand,
            crate::dto::gateway::GatewayReply,
            crate::dto::gateway::ReplyOutcome,
            crate::state::participant::Stance,
            crate::state::state_machine::MatchPhase,
            crate::rating::tiers::Tier,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "rooms", description = "Debate room commands and snapshots"),
        (name = "events", description = "Voice, message and guild events forwarded by the gateway"),
        (name = "members", description = "Skill ratings and propositions"),
        (name = "admin", description = "Session lifecycle"),
        (name = "gateway", description = "WebSocket channel carrying guild platform calls"),
    )
)]
pub struct ApiDoc;
