use std::sync::Arc;

use rand::seq::IndexedRandom;
use tracing::{debug, info, warn};

use crate::{
    dao::{
        member_store::MemberStore,
        models::{MemberEntity, RubricEntity},
    },
    dto::skill::{CompareRequest, ComparisonView, PropositionView, SkillView},
    error::ServiceError,
    ids::MemberId,
    rating::{
        Skill,
        tiers::{floor_tier, plan_tier_sync},
    },
    state::SharedState,
};

/// Load `member`'s record, creating and saving a default one when absent.
pub async fn get_or_init(
    store: &Arc<dyn MemberStore>,
    member: MemberId,
) -> Result<MemberEntity, ServiceError> {
    if let Some(entity) = store.find_member(member).await? {
        return Ok(entity);
    }

    let entity = MemberEntity::new(member);
    store.save_member(entity.clone()).await?;
    debug!(member = %member, "initialized member skill");
    Ok(entity)
}

/// Current skill belief of `member`, used to seed a participant.
pub async fn skill_of(state: &SharedState, member: MemberId) -> Result<Skill, ServiceError> {
    let store = state.require_member_store().await?;
    Ok(get_or_init(&store, member).await?.skill())
}

/// Skill view with leaderboard position; also brings the member's tier role up to date.
pub async fn skill_view(state: &SharedState, member: MemberId) -> Result<SkillView, ServiceError> {
    let store = state.require_member_store().await?;
    let entity = get_or_init(&store, member).await?;
    sync_tier_roles(state, member, entity.rating).await;
    view(&store, &entity).await
}

/// Win and draw probabilities for a debate between two members.
pub async fn compare(
    state: &SharedState,
    request: CompareRequest,
) -> Result<ComparisonView, ServiceError> {
    if request.a == request.b {
        return Err(ServiceError::InvalidInput(
            "cannot compare a member with themselves".into(),
        ));
    }

    let store = state.require_member_store().await?;
    let a = get_or_init(&store, request.a).await?.skill();
    let b = get_or_init(&store, request.b).await?.skill();
    let prediction = state.engine().predict(a, b);

    Ok(ComparisonView {
        a: request.a,
        b: request.b,
        a_wins: prediction.first_wins,
        b_wins: prediction.second_wins,
        draw: prediction.draw,
    })
}

/// Re-initialize unusable skill values and re-sync tier roles.
pub async fn repair(state: &SharedState, member: MemberId) -> Result<SkillView, ServiceError> {
    let store = state.require_member_store().await?;
    let mut entity = get_or_init(&store, member).await?;
    if entity.repair() {
        store.save_member(entity.clone()).await?;
        info!(member = %member, "member skill re-initialized");
    }
    sync_tier_roles(state, member, entity.rating).await;
    view(&store, &entity).await
}

/// Handle a member joining the guild: sync roles for known members, create a record otherwise.
pub async fn member_joined(state: &SharedState, member: MemberId) -> Result<(), ServiceError> {
    let store = state.require_member_store().await?;
    match store.find_member(member).await? {
        Some(entity) => sync_tier_roles(state, member, entity.rating).await,
        None => store.save_member(MemberEntity::new(member)).await?,
    }
    Ok(())
}

/// Count a ballot cast for `candidate`.
pub async fn record_ballot(
    state: &SharedState,
    candidate: MemberId,
    rubric: RubricEntity,
) -> Result<(), ServiceError> {
    let store = state.require_member_store().await?;
    let mut entity = get_or_init(&store, candidate).await?;
    entity.record_ballot(rubric);
    store.save_member(entity).await?;
    Ok(())
}

/// Count one more match `member` debated in.
pub async fn record_debate(state: &SharedState, member: MemberId) -> Result<(), ServiceError> {
    let store = state.require_member_store().await?;
    let mut entity = get_or_init(&store, member).await?;
    entity.debate_count += 1;
    store.save_member(entity).await?;
    Ok(())
}

/// Pick a proposition from the configured list.
pub fn random_proposition(state: &SharedState) -> Result<PropositionView, ServiceError> {
    state
        .config()
        .propositions()
        .choose(&mut rand::rng())
        .map(|text| PropositionView { text: text.clone() })
        .ok_or_else(|| ServiceError::NotFound("no propositions are configured".into()))
}

/// Make `member` hold exactly the tier role matching `rating`.
///
/// Failures are logged; nothing is changed when the member already holds the right role.
pub async fn sync_tier_roles(state: &SharedState, member: MemberId, rating: f64) {
    let held = match state.roles().member_roles(member).await {
        Ok(held) => held,
        Err(err) => {
            warn!(member = %member, error = %err, "failed to read member roles");
            return;
        }
    };

    let tier = floor_tier(rating);
    let Some(sync) = plan_tier_sync(tier, &held, state.config().tier_roles()) else {
        debug!(member = %member, ?tier, "no role configured for tier");
        return;
    };
    if sync.is_noop() {
        return;
    }

    if let Some(role) = sync.add {
        if let Err(err) = state.roles().add_role(member, role).await {
            warn!(member = %member, role = %role, error = %err, "failed to add tier role");
        }
    }
    for role in sync.remove {
        if let Err(err) = state.roles().remove_role(member, role).await {
            warn!(member = %member, role = %role, error = %err, "failed to remove tier role");
        }
    }
}

async fn view(store: &Arc<dyn MemberStore>, entity: &MemberEntity) -> Result<SkillView, ServiceError> {
    let above = store.count_rated_above(entity.rating).await?;
    Ok(SkillView::new(entity, above + 1))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::AppConfig,
        guild::memory::{GuildCall, RecordingGuild},
        ids::{ChannelId, RoleId},
        rating::tiers::Tier,
        state::AppState,
    };

    fn setup() -> (SharedState, Arc<RecordingGuild>) {
        let guild = Arc::new(RecordingGuild::new());
        let state = AppState::for_tests(AppConfig::for_tests(&[ChannelId(100)]), guild.clone());
        (state, guild)
    }

    fn role_for(state: &SharedState, tier: Tier) -> RoleId {
        state.config().tier_roles()[&tier]
    }

    #[tokio::test]
    async fn skill_view_initializes_and_ranks() {
        let (state, _) = setup();
        let store = state.member_store().await.unwrap();
        let mut strong = MemberEntity::new(MemberId(9));
        strong.set_skill(Skill::new(40.0, 2.0));
        store.save_member(strong).await.unwrap();

        let view = skill_view(&state, MemberId(1)).await.unwrap();

        assert_eq!(view.tier, Tier::Novice);
        assert_eq!(view.position, 2);
        assert!(store.find_member(MemberId(1)).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn tier_sync_swaps_stale_roles_once() {
        let (state, guild) = setup();
        let member = MemberId(5);
        let stale = role_for(&state, Tier::Legend);
        guild.set_roles(member, vec![stale, RoleId(42)]);

        sync_tier_roles(&state, member, 500.0).await;
        let novice = role_for(&state, Tier::Novice);
        let mut roles = guild.roles_of(member);
        roles.sort();
        assert_eq!(roles, vec![RoleId(42), novice]);

        guild.clear();
        sync_tier_roles(&state, member, 500.0).await;
        assert!(guild.calls().is_empty());
    }

    #[tokio::test]
    async fn degraded_storage_rejects_lookups() {
        let (state, _) = setup();
        state.set_degraded(true);
        assert!(matches!(
            skill_view(&state, MemberId(1)).await,
            Err(ServiceError::Degraded)
        ));
    }

    #[tokio::test]
    async fn repair_resets_broken_skill() {
        let (state, guild) = setup();
        let store = state.member_store().await.unwrap();
        let mut broken = MemberEntity::new(MemberId(3));
        broken.mu = f64::NAN;
        store.save_member(broken).await.unwrap();

        let view = repair(&state, MemberId(3)).await.unwrap();

        assert!((view.mu - 25.0).abs() < 1e-9);
        assert!(
            guild
                .calls()
                .iter()
                .any(|call| matches!(call, GuildCall::AddRole { member, .. } if *member == MemberId(3)))
        );
    }

    #[tokio::test]
    async fn ballots_and_debates_are_counted() {
        let (state, _) = setup();
        record_debate(&state, MemberId(2)).await.unwrap();
        record_ballot(
            &state,
            MemberId(2),
            RubricEntity {
                charitable: true,
                ..RubricEntity::default()
            },
        )
        .await
        .unwrap();

        let store = state.member_store().await.unwrap();
        let entity = store.find_member(MemberId(2)).await.unwrap().unwrap();
        assert_eq!(entity.debate_count, 1);
        assert_eq!(entity.vote_count, 1);
        assert_eq!(entity.charitable, 1);
    }

    #[tokio::test]
    async fn compare_favours_the_stronger_member() {
        let (state, _) = setup();
        let store = state.member_store().await.unwrap();
        let mut strong = MemberEntity::new(MemberId(1));
        strong.set_skill(Skill::new(35.0, 4.0));
        store.save_member(strong).await.unwrap();

        let view = compare(
            &state,
            CompareRequest {
                a: MemberId(1),
                b: MemberId(2),
            },
        )
        .await
        .unwrap();
        assert!(view.a_wins > view.b_wins);
        assert!((view.a_wins + view.b_wins - 1.0).abs() < 1e-9);
        assert!(random_proposition(&state).is_ok());
    }
}
