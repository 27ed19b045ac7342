//! Filtered sources feeding the graph builder

use chrono::{DateTime, Duration, Utc};
use gittree_core::{CommitRecord, FilterParams, Generation};
use gittree_git::{CommitSource, FilterEngine, MemoryRepo, MemorySourceFactory, SourceFactory};
use gittree_graph::{layout_all, Connector};

fn at(minutes: i64) -> DateTime<Utc> {
    DateTime::<Utc>::default() + Duration::minutes(minutes)
}

/// alice and bob interleaved on two branches:
///
/// ```text
/// m   (bob)   merge of a3 into b2
/// a3  (alice)
/// b2  (bob)
/// a2  (alice)
/// b1  (bob)
/// a1  (alice) root
/// ```
fn repo() -> MemoryRepo {
    MemoryRepo::new(vec![
        CommitRecord::new("a1", &[]).with_author("alice", "a@x").with_time(at(1)),
        CommitRecord::new("b1", &["a1"]).with_author("bob", "b@x").with_time(at(2)),
        CommitRecord::new("a2", &["a1"]).with_author("alice", "a@x").with_time(at(3)),
        CommitRecord::new("b2", &["b1"]).with_author("bob", "b@x").with_time(at(4)),
        CommitRecord::new("a3", &["a2"]).with_author("alice", "a@x").with_time(at(5)),
        CommitRecord::new("m", &["b2", "a3"]).with_author("bob", "b@x").with_time(at(6)),
    ])
}

async fn pull_all(factory: &MemorySourceFactory, params: &FilterParams) -> Vec<CommitRecord> {
    let config = FilterEngine::build(params, Utc::now()).unwrap();
    let source = factory.create(&config).unwrap();
    source.pull(0, usize::MAX).await.unwrap().records
}

#[tokio::test]
async fn test_unfiltered_history_has_two_lanes() {
    let factory = MemorySourceFactory::new(repo());
    let records = pull_all(&factory, &FilterParams::default()).await;
    let layout = layout_all(Generation(1), records);

    assert_eq!(layout.rows.len(), 6);
    assert_eq!(layout.max_lane_seen, 1);
    assert_eq!(layout.rows[0].connectors, vec![Connector::MergeIn { lane: 1 }]);
}

#[tokio::test]
async fn test_author_filter_relayouts_from_lane_zero() {
    let factory = MemorySourceFactory::new(repo());
    let params = FilterParams {
        author: Some("alice".into()),
        ..Default::default()
    };
    let layout = layout_all(Generation(2), pull_all(&factory, &params).await);

    let ids: Vec<&str> = layout.rows.iter().map(|r| r.record.id.as_str()).collect();
    assert_eq!(ids, vec!["a3", "a2", "a1"]);
    assert!(layout.rows.iter().all(|r| r.lane == 0));
    assert!(layout.rows.iter().all(|r| r.connectors.is_empty()));
    assert_eq!(layout.max_lane_seen, 0);
}

#[tokio::test]
async fn test_cap_of_two_on_linear_history() {
    let records: Vec<CommitRecord> = (1..=5)
        .map(|i| {
            let id = format!("c{}", i);
            let parent = format!("c{}", i - 1);
            let record = if i == 1 {
                CommitRecord::new(id, &[])
            } else {
                CommitRecord::new(id, &[parent.as_str()])
            };
            record.with_time(at(i))
        })
        .collect();
    let factory = MemorySourceFactory::new(MemoryRepo::new(records));
    let params = FilterParams {
        max_commits: Some(2),
        ..Default::default()
    };
    let layout = layout_all(Generation(1), pull_all(&factory, &params).await);

    assert_eq!(layout.rows.len(), 2);
    assert!(layout.rows[1].has_boundary());
    assert_eq!(layout.rows[1].record.id, "c4");
}
