/// Session lifecycle: enable and lockdown.
pub mod admin_service;
/// Conclusion path of a match.
pub mod conclusion;
/// Room commands issued by members.
pub mod debate_service;
/// OpenAPI documentation generation.
pub mod documentation;
/// Gateway WebSocket session handling.
pub mod gateway_service;
/// Health check service.
pub mod health_service;
/// Voice, chat and guild membership events.
pub mod membership_service;
/// Pure room decisions returning effect lists.
pub mod orchestrator;
/// Effect executor and interface message upkeep.
pub mod reconciler;
/// Visibility sweep and feed drain.
pub mod scheduler;
/// Member skill lookups, comparisons and tier roles.
pub mod skill_service;
/// Member store connection supervisor with degraded-mode handling.
pub mod storage_supervisor;
