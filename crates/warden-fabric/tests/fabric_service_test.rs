//! End-to-end fabric scenarios (spec §8: S1 flat-threaded mention
//! visibility, S2 `@here` expansion, plus the universal invariants).

use std::sync::Arc;

use warden_fabric::{FabricService, SubscriptionMode, SystemClock};

fn service() -> FabricService {
    FabricService::new(Arc::new(SystemClock))
}

#[test]
fn s1_flat_threaded_mention_visibility() {
    let fabric = service();
    let channel_id = fabric.create_channel("tasks", "coordinator").unwrap();
    fabric.subscribe("tasks", "coordinator", SubscriptionMode::All).unwrap();
    fabric.subscribe("tasks", "worker-1", SubscriptionMode::All).unwrap();
    fabric.subscribe("tasks", "worker-2", SubscriptionMode::All).unwrap();

    let root = fabric.send_message("tasks", "assign", "note", "coordinator", []).unwrap();
    let reply = fabric
        .reply(root.id, "done @coordinator", "note", "worker-1", ["coordinator".to_string()])
        .unwrap();

    let coordinator_unacked = fabric.get_unacked("coordinator");
    let coord_summary = coordinator_unacked.get(&channel_id).expect("coordinator has unread");
    assert_eq!(coord_summary.count, 1);
    assert_eq!(coord_summary.thread_ids, vec![reply.id]);

    let worker1_unacked = fabric.get_unacked("worker-1");
    let w1_summary = worker1_unacked.get(&channel_id).expect("worker-1 has unread");
    assert_eq!(w1_summary.count, 1);
    assert_eq!(w1_summary.thread_ids, vec![root.id]);

    let worker2_unacked = fabric.get_unacked("worker-2");
    let w2_summary = worker2_unacked.get(&channel_id).expect("worker-2 has unread");
    assert_eq!(w2_summary.count, 1);
    assert_eq!(w2_summary.thread_ids, vec![root.id]);
}

#[test]
fn s2_here_expansion() {
    let fabric = service();
    let channel_id = fabric.create_channel("tasks", "coordinator").unwrap();
    fabric.register_participant("worker-1", "worker");
    fabric.register_participant("worker-2", "worker");

    let ping = fabric
        .send_message("tasks", "@here ping", "note", "coordinator", ["here".to_string()])
        .unwrap();

    let w1 = fabric.get_unacked("worker-1");
    assert_eq!(w1.get(&channel_id).map(|s| s.thread_ids.clone()), Some(vec![ping.id]));

    // worker-3 is never registered, so @here doesn't reach it.
    let w3 = fabric.get_unacked("worker-3");
    assert!(w3.values().all(|summary| !summary.thread_ids.contains(&ping.id)));

    let registered: std::collections::BTreeSet<_> = fabric.participants().into_iter().map(|p| p.agent_id).collect();
    assert_eq!(registered, ["worker-1", "worker-2"].into_iter().map(String::from).collect());
}

#[test]
fn ack_is_idempotent() {
    let fabric = service();
    fabric.create_channel("tasks", "coordinator").unwrap();
    let msg = fabric.send_message("tasks", "hi", "note", "coordinator", ["worker-1".to_string()]).unwrap();

    fabric.ack("worker-1", [msg.id]).unwrap();
    fabric.ack("worker-1", [msg.id]).unwrap(); // no-op, must not error or duplicate

    let unacked = fabric.get_unacked("worker-1");
    assert!(unacked.values().all(|s| !s.thread_ids.contains(&msg.id)));
}

#[test]
fn ack_rejects_unknown_thread() {
    let fabric = service();
    let bogus = uuid::Uuid::now_v7();
    let err = fabric.ack("worker-1", [bogus]).unwrap_err();
    assert!(matches!(err, warden_fabric::FabricError::UnknownAckTarget { .. }));
}

#[test]
fn author_never_sees_own_message() {
    let fabric = service();
    fabric.create_channel("tasks", "coordinator").unwrap();
    let msg = fabric.send_message("tasks", "hi", "note", "coordinator", []).unwrap();

    let unacked = fabric.get_unacked("coordinator");
    assert!(unacked.values().all(|s| !s.thread_ids.contains(&msg.id)));
}

#[test]
fn reply_to_reply_targets_root() {
    let fabric = service();
    fabric.create_channel("tasks", "coordinator").unwrap();
    let root = fabric.send_message("tasks", "root", "note", "coordinator", []).unwrap();
    let reply1 = fabric.reply(root.id, "r1", "note", "worker-1", []).unwrap();
    let reply2 = fabric.reply(reply1.id, "r2", "note", "worker-2", ["worker-1".to_string()]).unwrap();

    // worker-1 is not a participant of the root (only coordinator is, since
    // replies don't augment it) but is directly mentioned by reply2.
    let unacked = fabric.get_unacked("worker-1");
    assert!(unacked.values().any(|s| s.thread_ids.contains(&reply2.id)));
}

#[test]
fn archived_thread_excluded_from_unread() {
    let fabric = service();
    fabric.create_channel("tasks", "coordinator").unwrap();
    let msg = fabric.send_message("tasks", "hi", "note", "coordinator", ["worker-1".to_string()]).unwrap();
    fabric.archive(msg.id).unwrap();

    let unacked = fabric.get_unacked("worker-1");
    assert!(unacked.values().all(|s| !s.thread_ids.contains(&msg.id)));
}

#[test]
fn list_history_orders_newest_first_with_reply_counts() {
    let fabric = service();
    fabric.create_channel("tasks", "coordinator").unwrap();
    let first = fabric.send_message("tasks", "first", "note", "coordinator", []).unwrap();
    std::thread::sleep(std::time::Duration::from_millis(2));
    let second = fabric.send_message("tasks", "second", "note", "coordinator", []).unwrap();
    fabric.reply(first.id, "reply", "note", "worker-1", []).unwrap();

    let history = fabric.list_history("tasks", 10, None).unwrap();
    assert_eq!(history[0].message.id, second.id);
    assert_eq!(history[1].message.id, first.id);
    assert_eq!(history[1].reply_count, 1);
    assert_eq!(history[0].reply_count, 0);
}

#[test]
fn send_message_requires_existing_channel() {
    let fabric = service();
    let err = fabric.send_message("missing", "hi", "note", "coordinator", []).unwrap_err();
    assert!(matches!(err, warden_fabric::FabricError::ChannelNotFound { .. }));
}

#[test]
fn reply_requires_existing_parent() {
    let fabric = service();
    let bogus = uuid::Uuid::now_v7();
    let err = fabric.reply(bogus, "hi", "note", "coordinator", []).unwrap_err();
    assert!(matches!(err, warden_fabric::FabricError::ParentNotFound { .. }));
}

#[test]
fn reactions_toggle() {
    let fabric = service();
    fabric.create_channel("tasks", "coordinator").unwrap();
    let msg = fabric.send_message("tasks", "hi", "note", "coordinator", []).unwrap();

    fabric.react(msg.id, "worker-1", "thumbsup", true).unwrap();
    assert!(fabric.reactions_for(msg.id, "thumbsup").contains("worker-1"));

    fabric.react(msg.id, "worker-1", "thumbsup", false).unwrap();
    assert!(!fabric.reactions_for(msg.id, "thumbsup").contains("worker-1"));
}

#[test]
fn attachments_are_recorded() {
    let fabric = service();
    fabric.create_channel("tasks", "coordinator").unwrap();
    let msg = fabric.send_message("tasks", "hi", "note", "coordinator", []).unwrap();

    fabric.attach(msg.id, "/tmp/report.pdf", "report.pdf").unwrap();
    let attachments = fabric.attachments_for(msg.id);
    assert_eq!(attachments.len(), 1);
    assert_eq!(attachments[0].name, "report.pdf");
}
