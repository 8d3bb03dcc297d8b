//! Rank to points table used when an answer is revealed by a buzzer winner.

/// Points awarded for an answer of the given popularity rank.
///
/// Ranks 7 and 8 share the lowest value; any rank outside `1..=8` scores 0.
pub const fn points_for_rank(rank: i32) -> i32 {
    match rank {
        1 => 50,
        2 => 40,
        3 => 30,
        4 => 20,
        5 => 15,
        6 => 10,
        7 | 8 => 5,
        _ => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::points_for_rank;

    #[test]
    fn table_matches_published_values() {
        let expected = [(1, 50), (2, 40), (3, 30), (4, 20), (5, 15), (6, 10), (7, 5), (8, 5)];
        for (rank, points) in expected {
            assert_eq!(points_for_rank(rank), points, "rank {rank}");
        }
    }

    #[test]
    fn unmapped_ranks_score_nothing() {
        assert_eq!(points_for_rank(9), 0);
        assert_eq!(points_for_rank(0), 0);
        assert_eq!(points_for_rank(-3), 0);
        assert_eq!(points_for_rank(i32::MAX), 0);
    }
}
