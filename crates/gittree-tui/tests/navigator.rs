//! Navigator behaviour against an in-memory repository

use chrono::{DateTime, Duration, Utc};
use gittree_core::{
    CommitRecord, FilterParams, GitTreeError, MutationFailure, MutationRequest, SourceConfig,
};
use gittree_git::{MemoryRepo, MemorySourceFactory};
use gittree_tui::{Command, Effect, Input, Navigator, NavigatorConfig, Phase, StatusKind, WorkerMessage};
use std::sync::Arc;

fn at(minutes: i64) -> DateTime<Utc> {
    DateTime::<Utc>::default() + Duration::minutes(minutes)
}

/// c1 <- c2 <- ... <- cn, alternating authors alice and bob
fn linear(n: usize) -> MemoryRepo {
    let records = (1..=n)
        .map(|i| {
            let id = format!("c{:02}", i);
            let parent = format!("c{:02}", i - 1);
            let parents: Vec<&str> = if i == 1 { vec![] } else { vec![parent.as_str()] };
            let author = if i % 2 == 1 { "alice" } else { "bob" };
            CommitRecord::new(id.clone(), &parents)
                .with_author(author, format!("{}@example.com", author))
                .with_time(at(i as i64))
                .with_subject(format!("commit {}", i))
        })
        .collect();
    MemoryRepo::new(records)
}

fn navigator(repo: MemoryRepo, config: NavigatorConfig) -> Navigator {
    Navigator::new(
        Arc::new(MemorySourceFactory::new(repo)),
        FilterParams::default(),
        SourceConfig::default(),
        config,
    )
    .unwrap()
}

/// Run queued effects until none are left. Dispatches are returned instead
/// of executed.
async fn drive(nav: &mut Navigator) -> Vec<MutationRequest> {
    let mut dispatched = Vec::new();
    loop {
        let effects = nav.take_effects();
        if effects.is_empty() {
            return dispatched;
        }
        for effect in effects {
            match effect {
                Effect::Pull {
                    generation,
                    source,
                    offset,
                    count,
                } => {
                    let result = source.pull(offset, count).await;
                    nav.handle_message(WorkerMessage::Batch {
                        generation,
                        offset,
                        result,
                    });
                }
                Effect::LoadDetails {
                    generation,
                    source,
                    id,
                } => {
                    let result = source.details(&id).await;
                    nav.handle_message(WorkerMessage::Details {
                        generation,
                        id,
                        result,
                    });
                }
                Effect::Dispatch(request) => dispatched.push(request),
            }
        }
    }
}

fn selected_id(nav: &Navigator) -> String {
    nav.selected_row().map(|row| row.record.id.clone()).unwrap_or_default()
}

fn press(nav: &mut Navigator, command: Command) {
    nav.handle(Input::Command(command));
}

#[tokio::test]
async fn test_materializes_only_viewport_plus_read_ahead() {
    let config = NavigatorConfig {
        read_ahead: 2,
        batch_size: 4,
        ..Default::default()
    };
    let mut nav = navigator(linear(30), config);
    nav.set_viewport(3, 80);
    drive(&mut nav).await;

    assert!(nav.view().len() >= 5);
    assert!(nav.view().len() < 30);
    assert!(!nav.view().is_exhausted());
    assert_eq!(nav.phase(), Phase::Idle);
}

#[tokio::test]
async fn test_bottom_loads_until_exhausted() {
    let config = NavigatorConfig {
        read_ahead: 1,
        batch_size: 4,
        ..Default::default()
    };
    let mut nav = navigator(linear(30), config);
    nav.set_viewport(3, 80);
    drive(&mut nav).await;

    press(&mut nav, Command::Bottom);
    assert_eq!(nav.phase(), Phase::Loading);
    drive(&mut nav).await;
    assert!(nav.view().is_exhausted());
    assert_eq!(nav.selected(), 29);
    assert_eq!(selected_id(&nav), "c01");
    assert_eq!(nav.visible(), 27..30);

    press(&mut nav, Command::Top);
    assert_eq!(selected_id(&nav), "c30");
}

#[tokio::test]
async fn test_page_down_past_loaded_rows() {
    let config = NavigatorConfig {
        read_ahead: 0,
        batch_size: 4,
        ..Default::default()
    };
    let mut nav = navigator(linear(20), config);
    nav.set_viewport(5, 80);
    drive(&mut nav).await;
    assert_eq!(nav.view().len(), 5);

    press(&mut nav, Command::PageDown);
    drive(&mut nav).await;
    assert_eq!(nav.selected(), 5);
    assert_eq!(nav.top(), 1);

    // Repeated moves while rows are loading collapse into one target
    press(&mut nav, Command::PageDown);
    press(&mut nav, Command::PageDown);
    press(&mut nav, Command::PageDown);
    drive(&mut nav).await;
    assert_eq!(nav.selected(), 10);

    press(&mut nav, Command::PageDown);
    drive(&mut nav).await;
    assert_eq!(nav.selected(), 15);

    // Past the end of history the selection clamps to the last row
    press(&mut nav, Command::PageDown);
    drive(&mut nav).await;
    assert!(nav.view().is_exhausted());
    assert_eq!(nav.selected(), 19);
}

#[tokio::test]
async fn test_jump_to_parent_loads_it() {
    let config = NavigatorConfig {
        read_ahead: 0,
        batch_size: 8,
        ..Default::default()
    };
    let mut nav = navigator(linear(10), config);
    nav.set_viewport(1, 80);
    drive(&mut nav).await;
    assert_eq!(nav.view().len(), 1);

    press(&mut nav, Command::JumpToParent);
    drive(&mut nav).await;
    assert_eq!(selected_id(&nav), "c09");

    press(&mut nav, Command::JumpToChild);
    assert_eq!(selected_id(&nav), "c10");
}

#[tokio::test]
async fn test_filter_starts_new_generation() {
    let mut nav = navigator(linear(6), NavigatorConfig::default());
    nav.set_viewport(10, 80);

    // First pull is still in flight when the filter changes
    let stale = nav.take_effects();
    assert_eq!(stale.len(), 1);

    press(&mut nav, Command::MoveDown);
    nav.apply_filter(FilterParams {
        author: Some("alice".into()),
        ..Default::default()
    })
    .unwrap();
    assert_eq!(nav.generation().0, 2);
    assert_eq!(nav.selected(), 0);

    // Late result of the previous generation is dropped
    for effect in stale {
        if let Effect::Pull {
            generation,
            source,
            offset,
            count,
        } = effect
        {
            let result = source.pull(offset, count).await;
            nav.handle_message(WorkerMessage::Batch {
                generation,
                offset,
                result,
            });
        }
    }
    assert!(nav.view().is_empty());

    drive(&mut nav).await;
    let rows = nav.view().rows();
    assert_eq!(rows.len(), 3);
    assert!(rows.iter().all(|row| row.record.author_name == "alice"));
    assert!(rows.iter().all(|row| row.generation.0 == 2));
    assert!(rows.iter().all(|row| row.lane == 0));
    assert_eq!(nav.view().max_lane_seen(), 0);
}

#[tokio::test]
async fn test_invalid_filter_changes_nothing() {
    let mut nav = navigator(linear(4), NavigatorConfig::default());
    nav.set_viewport(10, 80);
    drive(&mut nav).await;
    press(&mut nav, Command::MoveDown);

    let err = nav
        .apply_filter(FilterParams {
            since: Some("next tuesday".into()),
            ..Default::default()
        })
        .unwrap_err();
    assert!(matches!(err, GitTreeError::InvalidFilter(_)));
    assert_eq!(nav.generation().0, 1);
    assert_eq!(nav.selected(), 1);
    assert_eq!(nav.view().len(), 4);

    // Same through the prompt: the prompt stays open with an error
    press(&mut nav, Command::StartFilter);
    for c in "range:main..-x".chars() {
        nav.handle(Input::Char(c));
    }
    nav.handle(Input::Submit);
    assert!(nav.prompt().is_some());
    assert_eq!(nav.status().map(|s| s.kind), Some(StatusKind::Error));
    assert_eq!(nav.generation().0, 1);

    nav.handle(Input::Cancel);
    assert!(nav.prompt().is_none());
    assert_eq!(nav.selected(), 1);
}

#[tokio::test]
async fn test_filter_prompt_applies_query() {
    let mut nav = navigator(linear(4), NavigatorConfig::default());
    nav.set_viewport(10, 80);
    drive(&mut nav).await;

    press(&mut nav, Command::StartFilter);
    for c in "author:bob".chars() {
        nav.handle(Input::Char(c));
    }
    nav.handle(Input::Submit);
    drive(&mut nav).await;

    assert!(nav.prompt().is_none());
    assert_eq!(nav.params().author.as_deref(), Some("bob"));
    assert_eq!(nav.view().len(), 2);

    // An empty query clears every filter
    press(&mut nav, Command::StartFilter);
    for _ in 0.."author:bob".len() {
        nav.handle(Input::Backspace);
    }
    nav.handle(Input::Submit);
    drive(&mut nav).await;
    assert_eq!(nav.view().len(), 4);
    assert_eq!(nav.generation().0, 3);
}

#[tokio::test]
async fn test_reset_requires_confirmation() {
    let mut nav = navigator(linear(3), NavigatorConfig::default());
    nav.set_viewport(10, 80);
    drive(&mut nav).await;
    press(&mut nav, Command::MoveDown);

    press(&mut nav, Command::Reset);
    let request = MutationRequest::ResetHard {
        target: "c02".into(),
    };
    assert_eq!(nav.phase(), Phase::ConfirmPending(request.clone()));

    // Declining discards the action
    nav.handle(Input::Cancel);
    assert_eq!(nav.phase(), Phase::Idle);
    assert!(drive(&mut nav).await.is_empty());

    press(&mut nav, Command::Reset);
    nav.handle(Input::Confirm);
    assert_eq!(nav.phase(), Phase::Loading);
    assert_eq!(drive(&mut nav).await, vec![request.clone()]);

    // Input is ignored while the mutation runs, quitting included
    press(&mut nav, Command::Quit);
    press(&mut nav, Command::MoveDown);
    assert_eq!(nav.phase(), Phase::Loading);
    assert_eq!(nav.selected(), 1);

    nav.handle_message(WorkerMessage::ActionFinished {
        request,
        result: Ok(()),
    });
    assert_eq!(nav.generation().0, 2);
    drive(&mut nav).await;
    assert_eq!(nav.phase(), Phase::Idle);
    assert_eq!(selected_id(&nav), "c02");
    assert!(nav.status().is_some_and(|s| s.text.starts_with("Done")));
}

#[tokio::test]
async fn test_confirmation_can_be_disabled() {
    let config = NavigatorConfig {
        confirm_dangerous: false,
        ..Default::default()
    };
    let mut nav = navigator(linear(2), config);
    nav.set_viewport(10, 80);
    drive(&mut nav).await;

    press(&mut nav, Command::Reset);
    assert_eq!(
        drive(&mut nav).await,
        vec![MutationRequest::ResetHard {
            target: "c02".into()
        }]
    );
}

#[tokio::test]
async fn test_quit_from_confirmation() {
    let mut nav = navigator(linear(2), NavigatorConfig::default());
    nav.set_viewport(10, 80);
    drive(&mut nav).await;
    press(&mut nav, Command::Reset);
    press(&mut nav, Command::Quit);
    assert_eq!(nav.phase(), Phase::Exiting);
    assert!(drive(&mut nav).await.is_empty());
}

#[tokio::test]
async fn test_failed_action_keeps_generation() {
    let mut nav = navigator(linear(3), NavigatorConfig::default());
    nav.set_viewport(10, 80);
    drive(&mut nav).await;

    press(&mut nav, Command::Checkout);
    let dispatched = drive(&mut nav).await;
    assert_eq!(dispatched.len(), 1);

    nav.handle_message(WorkerMessage::ActionFinished {
        request: dispatched[0].clone(),
        result: Err(GitTreeError::BackendMutationFailed {
            reason: MutationFailure::DirtyWorkingTree,
            message: "commit your changes".into(),
        }),
    });
    assert_eq!(nav.phase(), Phase::Idle);
    assert_eq!(nav.generation().0, 1);
    let status = nav.status().unwrap();
    assert_eq!(status.kind, StatusKind::Error);
    assert!(status.text.contains("dirty working tree"));
}

#[tokio::test]
async fn test_repository_change_waits_for_action() {
    let mut nav = navigator(linear(3), NavigatorConfig::default());
    nav.set_viewport(10, 80);
    drive(&mut nav).await;

    press(&mut nav, Command::Revert);
    let dispatched = drive(&mut nav).await;

    nav.handle_message(WorkerMessage::RepositoryChanged);
    assert_eq!(nav.generation().0, 1);

    nav.handle_message(WorkerMessage::ActionFinished {
        request: dispatched[0].clone(),
        result: Err(GitTreeError::BackendMutationFailed {
            reason: MutationFailure::Conflict,
            message: "could not revert".into(),
        }),
    });
    // The deferred refresh runs once the action is over
    assert_eq!(nav.generation().0, 2);
}

#[tokio::test]
async fn test_repository_change_keeps_selection() {
    let mut nav = navigator(linear(5), NavigatorConfig::default());
    nav.set_viewport(10, 80);
    drive(&mut nav).await;
    press(&mut nav, Command::MoveDown);
    press(&mut nav, Command::MoveDown);

    nav.handle_message(WorkerMessage::RepositoryChanged);
    assert_eq!(nav.generation().0, 2);
    drive(&mut nav).await;
    assert_eq!(selected_id(&nav), "c03");
}

#[tokio::test]
async fn test_details_follow_selection() {
    let repo = linear(3).with_body("c03", "Body text").with_files("c02", &["src/main.rs"]);
    let mut nav = navigator(repo, NavigatorConfig::default());
    nav.set_viewport(10, 80);
    drive(&mut nav).await;

    press(&mut nav, Command::OpenDetails);
    assert!(nav.details().is_some_and(|pane| pane.is_loading()));
    drive(&mut nav).await;
    let pane = nav.details().unwrap();
    assert_eq!(pane.details.as_ref().map(|d| d.body.as_str()), Some("Body text"));

    press(&mut nav, Command::MoveDown);
    drive(&mut nav).await;
    let pane = nav.details().unwrap();
    assert_eq!(pane.record.id, "c02");
    assert_eq!(pane.details.as_ref().map(|d| d.files.len()), Some(1));

    nav.handle(Input::Cancel);
    assert!(nav.details().is_none());
}

#[tokio::test]
async fn test_follow_toggle_needs_single_path() {
    let mut nav = navigator(linear(3), NavigatorConfig::default());
    nav.set_viewport(10, 80);
    drive(&mut nav).await;

    nav.apply_filter(FilterParams {
        paths: vec!["src".into()],
        ..Default::default()
    })
    .unwrap();
    drive(&mut nav).await;
    assert_eq!(nav.generation().0, 2);

    press(&mut nav, Command::ToggleFollow);
    assert!(nav.params().follow);
    assert_eq!(nav.generation().0, 3);
}
