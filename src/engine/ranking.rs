use std::cmp::Ordering;

use crate::dao::models::ParticipantEntity;

/// Total order used by pool rankings: score descending, then earliest joiner, then id.
pub fn ranking_order(a: &ParticipantEntity, b: &ParticipantEntity) -> Ordering {
    b.score
        .cmp(&a.score)
        .then_with(|| a.created_at.cmp(&b.created_at))
        .then_with(|| a.id.cmp(&b.id))
}

/// Sort a pool's participants into ranking order.
pub fn rank(mut participants: Vec<ParticipantEntity>) -> Vec<ParticipantEntity> {
    participants.sort_by(ranking_order);
    participants
}

#[cfg(test)]
mod tests {
    use time::{Duration, macros::datetime};
    use uuid::Uuid;

    use super::*;

    fn participant(score: i32, joined_minutes: i64) -> ParticipantEntity {
        ParticipantEntity {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            pool_id: Uuid::nil(),
            score,
            created_at: datetime!(2022-11-01 09:00 UTC) + Duration::minutes(joined_minutes),
        }
    }

    #[test]
    fn higher_score_first() {
        let low = participant(3, 0);
        let high = participant(9, 10);
        let ranked = rank(vec![low.clone(), high.clone()]);
        assert_eq!(ranked, vec![high, low]);
    }

    #[test]
    fn ties_go_to_the_earliest_joiner() {
        let late = participant(5, 30);
        let early = participant(5, 1);
        let middle = participant(5, 15);
        let ranked = rank(vec![late.clone(), early.clone(), middle.clone()]);
        assert_eq!(ranked, vec![early, middle, late]);
    }

    #[test]
    fn identical_join_time_falls_back_to_id() {
        let mut a = participant(2, 0);
        let mut b = participant(2, 0);
        a.id = Uuid::from_u128(1);
        b.id = Uuid::from_u128(2);
        let ranked = rank(vec![b.clone(), a.clone()]);
        assert_eq!(ranked, vec![a, b]);
    }

    #[test]
    fn output_is_sorted_for_mixed_input() {
        let participants: Vec<_> = (0..20)
            .map(|i: i32| participant((i * 7) % 5, i64::from((i * 13) % 11)))
            .collect();
        let ranked = rank(participants);
        for pair in ranked.windows(2) {
            assert_ne!(ranking_order(&pair[0], &pair[1]), Ordering::Greater);
        }
    }
}
