use match_tracker::{execute, parse_line, Command, NotificationKind};

mod support;

use support::Fixture;

#[tokio::test]
async fn track_and_untrack_round_trip() {
    let mut fx = Fixture::new();
    fx.source().set_player("dave", "D1", Some(1500));

    let reply = execute(&fx.reconciler, &mut fx.state, "G1", Command::Track("dave".into())).await;
    assert_eq!(reply.text, "Now tracking FACEIT player: dave (ID: D1)");
    assert_eq!(fx.state.tracking.player_id_by_name("G1", "DAVE").as_deref(), Some("D1"));
    assert_eq!(fx.state.elo.current("D1"), Some(1500), "tracking seeds the ledger");

    let reply = execute(&fx.reconciler, &mut fx.state, "G1", Command::Track("Dave".into())).await;
    assert_eq!(reply.text, "Player Dave is already being tracked!");

    let reply = execute(&fx.reconciler, &mut fx.state, "G1", Command::Untrack("dave".into())).await;
    assert_eq!(reply.text, "Stopped tracking player dave.");
    assert!(fx.state.tracking.player_id_by_name("G1", "dave").is_none());

    let reply = execute(&fx.reconciler, &mut fx.state, "G1", Command::Untrack("dave".into())).await;
    assert_eq!(reply.text, "Player dave is not being tracked.");
}

#[tokio::test]
async fn unknown_player_is_not_tracked() {
    let mut fx = Fixture::new();
    let reply = execute(&fx.reconciler, &mut fx.state, "G1", Command::Track("ghost".into())).await;
    assert_eq!(reply.text, "Could not find player with name ghost");
    assert_eq!(fx.state.tracking.players("G1").len(), 3);
}

#[tokio::test]
async fn channel_commands_edit_destinations() {
    let mut fx = Fixture::new();
    let (community, cmd) = parse_line("G1 !addchannel chan-2").unwrap();
    let reply = execute(&fx.reconciler, &mut fx.state, &community, cmd).await;
    assert_eq!(reply.text, "chan-2 will now receive match notifications!");

    let reply = execute(&fx.reconciler, &mut fx.state, "G1", Command::AddChannel("chan-2".into())).await;
    assert_eq!(reply.text, "chan-2 is already receiving match notifications!");

    let reply = execute(&fx.reconciler, &mut fx.state, "G1", Command::ListChannels).await;
    assert_eq!(reply.text, "Channels receiving match notifications:\nchan-1\nchan-2");

    execute(&fx.reconciler, &mut fx.state, "G1", Command::RemoveChannel("chan-1".into())).await;
    assert_eq!(fx.state.tracking.destinations("G1"), vec!["chan-2".to_string()]);
}

#[tokio::test]
async fn group_history_does_not_touch_seen_lists() {
    let mut fx = Fixture::new();
    for id in ["A1", "B1", "C1"] {
        fx.source().set_history(id, &["M1", "M2"]);
    }
    fx.source().set_history("C1", &["M1"]);
    fx.source().set_match("M1", "FINISHED", "faction1");
    fx.source().set_stats("M1", &["alice", "bob", "carol"], &[]);

    let reply = execute(&fx.reconciler, &mut fx.state, "G1", Command::GroupHistory { count: 5 }).await;
    assert_eq!(reply.text, "1 group matches");
    assert_eq!(reply.notifications.len(), 1);
    assert!(matches!(reply.notifications[0].kind, NotificationKind::Group { .. }));
    assert!(fx.notifier().sent.borrow().is_empty());
    assert!(!fx.state.tracking.has_seen("G1", "A1", "M1"));
}

#[tokio::test]
async fn recent_builds_individual_views() {
    let mut fx = Fixture::new();
    fx.source().set_history("B1", &["M3", "M4"]);
    fx.source().set_match("M3", "FINISHED", "faction2");
    fx.source().set_stats("M3", &[], &["bob"]);

    let reply = execute(
        &fx.reconciler,
        &mut fx.state,
        "G1",
        Command::Recent { nickname: "bob".into(), count: 2 },
    )
    .await;
    assert_eq!(reply.text, "1 recent matches for bob (could not fetch: M4)");
    assert_eq!(reply.notifications[0].title, "Victory");
    assert!(!fx.state.tracking.has_seen("G1", "B1", "M3"));
}

#[tokio::test]
async fn elo_listing_is_sorted_by_rating() {
    let mut fx = Fixture::new();
    let reply = execute(&fx.reconciler, &mut fx.state, "G1", Command::Elo(None)).await;
    assert_eq!(reply.text, "No ELO data available for any tracked players. Try !updateelo first.");

    let reply = execute(&fx.reconciler, &mut fx.state, "G1", Command::UpdateElo).await;
    assert_eq!(reply.text, "Updated ELO for 3 players.");

    fx.source().set_player("carol", "C1", Some(1650));
    execute(&fx.reconciler, &mut fx.state, "G1", Command::UpdateElo).await;

    let reply = execute(&fx.reconciler, &mut fx.state, "G1", Command::Elo(None)).await;
    assert_eq!(
        reply.text,
        "Current ELO for tracked players:\nalice: 2000\nbob: 1800\ncarol: 1650 (+50)"
    );
    let reply = execute(&fx.reconciler, &mut fx.state, "G1", Command::Elo(Some("Carol".into()))).await;
    assert_eq!(reply.text, "Carol current ELO: 1650 (+50)");
}
