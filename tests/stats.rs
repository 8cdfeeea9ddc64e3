//! Integration tests for stat records: writing finished runs and folding them into rankings.

use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use pick_one_tournament::{
    fetch_newest_first, leaderboard, pick, start_run, stat_records, submit_result,
    AggregateError, Candidate, CandidatePool, JsonlStatStore, MatchRecord, Media,
    MemoryStatStore, ParticipantId, RankingView, Slot, StatPage, StatQuery, StatRecord,
    StatStore, StoreError, TimeRange, WinnerResult, WriteError,
};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

fn candidate(id: &str) -> Candidate {
    Candidate::new(id, id.to_uppercase(), Media::Image(format!("{id}.png")))
}

fn at(minutes: i64) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 5, 1, 9, 0, 0).unwrap() + Duration::minutes(minutes)
}

fn record_of(a: &str, b: &str, winner: &str, round: u32) -> MatchRecord {
    MatchRecord {
        round,
        slot_a: candidate(a),
        slot_b: candidate(b),
        winner: candidate(winner),
    }
}

/// a beats b, c beats d, a beats c.
fn four_way_result() -> WinnerResult {
    WinnerResult {
        tournament_id: "cats".into(),
        winner: candidate("a"),
        match_history: vec![
            record_of("a", "b", "a", 1),
            record_of("c", "d", "c", 1),
            record_of("a", "c", "a", 2),
        ],
    }
}

fn find<'a>(records: &'a [StatRecord], id: &str) -> &'a StatRecord {
    records.iter().find(|r| r.candidate_id == id).unwrap()
}

/// A store that is down until switched back on.
#[derive(Default)]
struct FlakyStore {
    down: AtomicBool,
    inner: MemoryStatStore,
}

#[async_trait]
impl StatStore for FlakyStore {
    async fn append_stat_records(&self, records: &[StatRecord]) -> Result<(), StoreError> {
        if self.down.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("maintenance".into()));
        }
        self.inner.append_stat_records(records).await
    }

    async fn query_stat_records(
        &self,
        query: &StatQuery,
        cursor: Option<&str>,
    ) -> Result<StatPage, StoreError> {
        if self.down.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("maintenance".into()));
        }
        self.inner.query_stat_records(query, cursor).await
    }
}

/// Returns whatever it was given, oldest first, ignoring the ordering contract.
struct OldestFirstStore(Vec<StatRecord>);

#[async_trait]
impl StatStore for OldestFirstStore {
    async fn append_stat_records(&self, _records: &[StatRecord]) -> Result<(), StoreError> {
        Ok(())
    }

    async fn query_stat_records(
        &self,
        _query: &StatQuery,
        _cursor: Option<&str>,
    ) -> Result<StatPage, StoreError> {
        Ok(StatPage {
            records: self.0.clone(),
            next_cursor: None,
        })
    }
}

/// Appends `late` through the inner store right after serving the first page.
struct AppendsDuringRead<S> {
    inner: S,
    late: Mutex<Option<StatRecord>>,
}

impl<S> AppendsDuringRead<S> {
    fn new(inner: S, late: StatRecord) -> Self {
        Self {
            inner,
            late: Mutex::new(Some(late)),
        }
    }
}

#[async_trait]
impl<S: StatStore> StatStore for AppendsDuringRead<S> {
    async fn append_stat_records(&self, records: &[StatRecord]) -> Result<(), StoreError> {
        self.inner.append_stat_records(records).await
    }

    async fn query_stat_records(
        &self,
        query: &StatQuery,
        cursor: Option<&str>,
    ) -> Result<StatPage, StoreError> {
        let page = self.inner.query_stat_records(query, cursor).await?;
        let late = self.late.lock().unwrap().take();
        if let Some(late) = late {
            self.inner.append_stat_records(&[late]).await?;
        }
        Ok(page)
    }
}

fn win_for(candidate_id: &str, minutes: i64) -> StatRecord {
    StatRecord {
        tournament_id: "cats".into(),
        participant_id: ParticipantId::User("bob".into()),
        candidate_id: candidate_id.into(),
        win_count: 1,
        match_wins: 1,
        match_count: 1,
        total_games: 1,
        created_at: at(minutes),
    }
}

#[test]
fn records_count_matches_and_the_overall_win() {
    let who = ParticipantId::User("alice".into());
    let records = stat_records(&four_way_result(), &who, at(0));
    assert_eq!(records.len(), 4);
    let ids: Vec<&str> = records.iter().map(|r| r.candidate_id.as_str()).collect();
    assert_eq!(ids, vec!["a", "b", "c", "d"]);

    let a = find(&records, "a");
    assert_eq!((a.win_count, a.match_wins, a.match_count, a.total_games), (1, 2, 2, 1));
    let c = find(&records, "c");
    assert_eq!((c.win_count, c.match_wins, c.match_count, c.total_games), (0, 1, 2, 1));
    let d = find(&records, "d");
    assert_eq!((d.win_count, d.match_wins, d.match_count, d.total_games), (0, 0, 1, 1));
    assert!(records
        .iter()
        .all(|r| r.participant_id == who && r.tournament_id == "cats" && r.created_at == at(0)));
}

#[test]
fn played_run_produces_consistent_records() {
    let pool: CandidatePool = (0..7)
        .map(|i| candidate(&format!("k{i}")))
        .collect::<Vec<_>>()
        .into();
    let mut run = start_run("seven", &pool, None, &mut StdRng::seed_from_u64(70)).unwrap();
    while run.current_match().is_some() {
        pick(&mut run, Slot::B).unwrap();
    }
    let result = run.take_result().unwrap();
    let records = stat_records(&result, &ParticipantId::new_guest(), at(0));

    assert_eq!(records.len(), 7);
    let total_matches: u32 = records.iter().map(|r| r.match_count).sum();
    assert_eq!(total_matches, 2 * 6);
    let total_wins: u32 = records.iter().map(|r| r.match_wins).sum();
    assert_eq!(total_wins, 6);
    assert_eq!(records.iter().map(|r| r.win_count).sum::<u32>(), 1);
}

#[tokio::test]
async fn store_failure_is_retryable_and_keeps_the_result() {
    let store = FlakyStore::default();
    store.down.store(true, Ordering::SeqCst);
    let result = four_way_result();
    let who = ParticipantId::new_guest();

    let err = submit_result(&store, &result, &who, at(0)).await.unwrap_err();
    assert!(err.is_retryable());
    assert!(matches!(err, WriteError::Store(StoreError::Unavailable(_))));
    assert!(store.inner.is_empty().await);

    store.down.store(false, Ordering::SeqCst);
    let written = submit_result(&store, &result, &who, at(1)).await.unwrap();
    assert_eq!(written, 4);
    assert_eq!(store.inner.len().await, 4);
}

#[tokio::test]
async fn empty_history_is_not_retryable() {
    let store = MemoryStatStore::new();
    let result = WinnerResult {
        tournament_id: "cats".into(),
        winner: candidate("a"),
        match_history: Vec::new(),
    };
    let err = submit_result(&store, &result, &ParticipantId::new_guest(), at(0))
        .await
        .unwrap_err();
    assert!(!err.is_retryable());
}

#[tokio::test]
async fn repeat_plays_multiply_wins_but_pin_match_counts() {
    let store = MemoryStatStore::new();
    let who = ParticipantId::User("alice".into());
    let result = four_way_result();
    for i in 0..5 {
        submit_result(&store, &result, &who, at(i)).await.unwrap();
    }

    let board = leaderboard(&store, &StatQuery::new("cats"), RankingView::Everyone)
        .await
        .unwrap();
    assert_eq!(board.records_read, 20);
    let a = &board.standings[0];
    assert_eq!(a.candidate_id, "a");
    assert_eq!(a.win_count, 5);
    assert_eq!(a.match_wins, 2);
    assert_eq!(a.match_count, 2);
    assert_eq!(a.total_games, 1);
    assert_eq!(a.win_rate(), Some(5.0));
    assert_eq!(a.match_win_rate(), Some(1.0));
}

#[tokio::test]
async fn newest_record_per_pair_wins_across_pages() {
    let store = MemoryStatStore::new();
    let who = ParticipantId::User("bob".into());

    // Older run: b beat a. Newer run: a won everything.
    let older = WinnerResult {
        tournament_id: "cats".into(),
        winner: candidate("b"),
        match_history: vec![record_of("a", "b", "b", 1)],
    };
    submit_result(&store, &older, &who, at(0)).await.unwrap();
    submit_result(&store, &four_way_result(), &who, at(10)).await.unwrap();

    let query = StatQuery::new("cats").with_page_size(1);
    let records = fetch_newest_first(&store, &query).await.unwrap();
    assert_eq!(records.len(), 6);
    assert!(records.windows(2).all(|w| w[0].created_at >= w[1].created_at));

    let board = leaderboard(&store, &query, RankingView::Everyone).await.unwrap();
    let ids: Vec<&str> = board
        .standings
        .iter()
        .map(|s| s.candidate_id.as_str())
        .collect();
    assert_eq!(ids[0], "a");
    assert_eq!(ids[1], "b", "b's old tournament win outranks c and d");
    let b = &board.standings[1];
    assert_eq!((b.win_count, b.match_wins, b.match_count), (1, 0, 1));
}

#[tokio::test]
async fn members_only_view_ignores_guests() {
    let store = MemoryStatStore::new();
    submit_result(&store, &four_way_result(), &ParticipantId::new_guest(), at(0))
        .await
        .unwrap();
    let member_run = WinnerResult {
        tournament_id: "cats".into(),
        winner: candidate("d"),
        match_history: vec![record_of("c", "d", "d", 1)],
    };
    submit_result(&store, &member_run, &ParticipantId::User("m".into()), at(1))
        .await
        .unwrap();

    let all = leaderboard(&store, &StatQuery::new("cats"), RankingView::Everyone)
        .await
        .unwrap();
    assert_eq!(all.standings.len(), 4);

    let members = leaderboard(&store, &StatQuery::new("cats"), RankingView::MembersOnly)
        .await
        .unwrap();
    assert_eq!(members.records_read, 2);
    let ids: Vec<&str> = members
        .standings
        .iter()
        .map(|s| s.candidate_id.as_str())
        .collect();
    assert_eq!(ids, vec!["d", "c"]);
}

#[tokio::test]
async fn time_range_limits_records() {
    let store = MemoryStatStore::new();
    let who = ParticipantId::User("alice".into());
    submit_result(&store, &four_way_result(), &who, at(0)).await.unwrap();
    submit_result(&store, &four_way_result(), &who, at(60)).await.unwrap();

    let query = StatQuery::new("cats").with_range(TimeRange {
        from: Some(at(30)),
        to: None,
    });
    let board = leaderboard(&store, &query, RankingView::Everyone).await.unwrap();
    assert_eq!(board.records_read, 4);
    assert_eq!(board.standings[0].win_count, 1);
}

#[tokio::test]
async fn unknown_tournament_is_an_empty_board_not_an_error() {
    let store = MemoryStatStore::new();
    let board = leaderboard(&store, &StatQuery::new("nobody"), RankingView::Everyone)
        .await
        .unwrap();
    assert!(board.standings.is_empty());
    assert_eq!(board.records_read, 0);
}

#[tokio::test]
async fn unavailable_store_surfaces_as_error() {
    let store = FlakyStore::default();
    store.down.store(true, Ordering::SeqCst);
    let err = leaderboard(&store, &StatQuery::new("cats"), RankingView::Everyone)
        .await
        .unwrap_err();
    assert!(matches!(err, AggregateError::Store(_)));
}

#[tokio::test]
async fn out_of_order_pages_are_rejected() {
    let who = ParticipantId::User("alice".into());
    let mut records = stat_records(&four_way_result(), &who, at(0));
    records.extend(stat_records(&four_way_result(), &who, at(5)));
    let store = OldestFirstStore(records);

    let err = leaderboard(&store, &StatQuery::new("cats"), RankingView::Everyone)
        .await
        .unwrap_err();
    assert!(matches!(err, AggregateError::OutOfOrder { .. }));
}

#[tokio::test]
async fn jsonl_store_round_trips_and_orders_newest_first() {
    let dir = tempfile::tempdir().unwrap();
    let store = JsonlStatStore::new(dir.path());
    let who = ParticipantId::new_guest();

    submit_result(&store, &four_way_result(), &who, at(0)).await.unwrap();
    submit_result(&store, &four_way_result(), &who, at(3)).await.unwrap();
    assert!(store.path_for("cats").unwrap().exists());

    let query = StatQuery::new("cats").with_page_size(3);
    let records = fetch_newest_first(&store, &query).await.unwrap();
    assert_eq!(records.len(), 8);
    assert!(records[..4].iter().all(|r| r.created_at == at(3)));

    // A second store over the same directory sees the same data.
    let reopened = JsonlStatStore::new(dir.path());
    let board = leaderboard(&reopened, &StatQuery::new("cats"), RankingView::Everyone)
        .await
        .unwrap();
    assert_eq!(board.standings[0].win_count, 2);
    assert_eq!(board.standings[0].total_games, 1);
}

#[tokio::test]
async fn jsonl_store_rejects_path_like_ids() {
    let dir = tempfile::tempdir().unwrap();
    let store = JsonlStatStore::new(dir.path());
    let err = store
        .query_stat_records(&StatQuery::new("../etc"), None)
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::InvalidKey(_)));
}

#[tokio::test]
async fn bad_cursor_is_a_store_error() {
    let store = MemoryStatStore::new();
    let err = store
        .query_stat_records(&StatQuery::new("cats"), Some("page-two"))
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::InvalidCursor(_)));
}

#[tokio::test]
async fn records_appended_mid_read_are_not_double_counted() {
    let inner = MemoryStatStore::new();
    inner
        .append_stat_records(&[win_for("a", 0), win_for("a", 1)])
        .await
        .unwrap();
    let store = AppendsDuringRead::new(inner, win_for("z", 5));

    let query = StatQuery::new("cats").with_page_size(1);
    let board = leaderboard(&store, &query, RankingView::Everyone).await.unwrap();
    assert_eq!(board.records_read, 2);
    assert_eq!(board.standings.len(), 1);
    assert_eq!(board.standings[0].candidate_id, "a");
    assert_eq!(board.standings[0].win_count, 2);

    // The next read sees the late record.
    let board = leaderboard(&store, &query, RankingView::Everyone).await.unwrap();
    assert_eq!(board.records_read, 3);
    assert_eq!(board.standings[1].candidate_id, "z");
}

#[tokio::test]
async fn jsonl_reads_keep_their_snapshot_while_writers_append() {
    let dir = tempfile::tempdir().unwrap();
    let inner = JsonlStatStore::new(dir.path());
    inner
        .append_stat_records(&[win_for("a", 0), win_for("b", 1), win_for("a", 2)])
        .await
        .unwrap();
    let store = AppendsDuringRead::new(inner, win_for("a", 9));

    let records = fetch_newest_first(&store, &StatQuery::new("cats").with_page_size(2))
        .await
        .unwrap();
    let times: Vec<DateTime<Utc>> = records.iter().map(|r| r.created_at).collect();
    assert_eq!(times, vec![at(2), at(1), at(0)]);
}
