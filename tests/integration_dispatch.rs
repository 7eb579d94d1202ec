//! End-to-end dispatch tests over the public API: batch files on disk in,
//! status snapshot on disk out, with a scripted channel standing in for the
//! browser.

use std::fs;
use std::path::PathBuf;

use tempfile::TempDir;

use sendr::batch;
use sendr::channel::{NullChannel, ScriptedChannel, ScriptedOutcome};
use sendr::classify::PhraseClassifier;
use sendr::domain::{DeliveryStatus, StatusSnapshot};
use sendr::mutate::INVISIBLE_MARKER;
use sendr::runner::{Dispatcher, Pacing, RunContext, RunOutcome, RunParams};
use sendr::store::StatusStore;

struct Workspace {
    _temp: TempDir,
    recipients: PathBuf,
    message: PathBuf,
    status: PathBuf,
}

impl Workspace {
    fn new(csv: &str, message: &str) -> Self {
        let temp = TempDir::new().unwrap();
        let recipients = temp.path().join("recipients_preview.csv");
        let message_path = temp.path().join("message.txt");
        let status = temp.path().join("send_status.json");
        fs::write(&recipients, csv).unwrap();
        fs::write(&message_path, message).unwrap();
        Self {
            _temp: temp,
            recipients,
            message: message_path,
            status,
        }
    }

    fn store(&self) -> StatusStore {
        StatusStore::new(&self.status)
    }
}

fn dispatcher<C: sendr::channel::DeliveryChannel>(
    channel: C,
    ws: &Workspace,
) -> Dispatcher<C, PhraseClassifier> {
    Dispatcher::new(channel, PhraseClassifier::default(), ws.store())
        .with_pacing(Pacing::none())
}

#[tokio::test]
async fn test_files_in_snapshot_out() {
    let ws = Workspace::new(
        "후원아이디,닉네임,후원하트\nviewer01,빛나는별,1200\nviewer02,,300\nviewer03,반짝,70\n",
        "hello\nworld",
    );
    let batch = batch::load_batch(&ws.recipients, &ws.message).unwrap();

    let mut d = dispatcher(ScriptedChannel::always_success(3), &ws);
    let summary = d
        .run(&batch, &RunParams::default(), &RunContext::new())
        .await
        .unwrap();

    assert_eq!(summary.attempted, 3);
    assert_eq!(summary.success, 3);
    assert_eq!(summary.outcome, RunOutcome::Finished);

    // The snapshot on disk carries ids and weights from the CSV
    let snapshot = ws.store().load().unwrap();
    assert_eq!(snapshot.items.len(), 3);
    assert_eq!(snapshot.items[0].id, "viewer01");
    assert_eq!(snapshot.items[0].weight, 1200);
    assert_eq!(snapshot.counts(), (0, 3, 0));

    // All three sends fall in mutation group 0: one marker on line 0
    let expected = format!("hello{INVISIBLE_MARKER}\nworld");
    for (_, message) in &d.channel().submissions {
        assert_eq!(*message, expected);
    }
}

#[tokio::test]
async fn test_mixed_feedback_outcomes() {
    let ws = Workspace::new(
        "후원아이디\nviewer01\nviewer02\nviewer03\n",
        "hi",
    );
    let batch = batch::load_batch(&ws.recipients, &ws.message).unwrap();

    let channel = ScriptedChannel::new(vec![
        ScriptedOutcome::feedback(&["쪽지가 전송되었습니다."]),
        ScriptedOutcome::feedback(&["해당 회원은 쪽지를 받지 않도록 설정했습니다."]),
        // A notice containing both vocabularies reads as success
        ScriptedOutcome::feedback(&["차단 해제 후 전송되었습니다"]),
    ]);
    let mut d = dispatcher(channel, &ws);
    let summary = d
        .run(&batch, &RunParams::default(), &RunContext::new())
        .await
        .unwrap();

    assert_eq!(summary.success, 2);
    assert_eq!(summary.fail, 1);

    let snapshot = ws.store().load().unwrap();
    assert_eq!(snapshot.items[0].status, DeliveryStatus::Success);
    assert_eq!(snapshot.items[1].status, DeliveryStatus::Fail);
    assert_eq!(snapshot.items[2].status, DeliveryStatus::Success);
}

#[tokio::test]
async fn test_resume_skips_settled_window() {
    let ws = Workspace::new(
        "후원아이디\nviewer01\nviewer02\nviewer03\nviewer04\n",
        "hi",
    );
    let batch = batch::load_batch(&ws.recipients, &ws.message).unwrap();

    // First run: only the first two
    let mut d = dispatcher(ScriptedChannel::always_success(2), &ws);
    let params = RunParams {
        limit: 2,
        ..Default::default()
    };
    d.run(&batch, &params, &RunContext::new()).await.unwrap();
    assert_eq!(ws.store().load().unwrap().counts(), (2, 2, 0));

    // Second run resumes at index 2; the earlier outcomes survive
    let mut d = dispatcher(ScriptedChannel::always_success(2), &ws);
    let params = RunParams {
        start: 2,
        ..Default::default()
    };
    let summary = d.run(&batch, &params, &RunContext::new()).await.unwrap();
    assert_eq!(summary.attempted, 2);

    let snapshot = ws.store().load().unwrap();
    assert_eq!(snapshot.counts(), (0, 4, 0));
    let submitted: Vec<&str> = d
        .channel()
        .submissions
        .iter()
        .map(|(id, _)| id.as_str())
        .collect();
    assert_eq!(submitted, vec!["viewer03", "viewer04"]);
}

#[tokio::test]
async fn test_reset_discards_prior_outcomes() {
    let ws = Workspace::new("후원아이디\nviewer01\nviewer02\n", "hi");
    let batch = batch::load_batch(&ws.recipients, &ws.message).unwrap();

    let mut d = dispatcher(ScriptedChannel::always_success(2), &ws);
    d.run(&batch, &RunParams::default(), &RunContext::new())
        .await
        .unwrap();
    assert_eq!(ws.store().load().unwrap().counts(), (0, 2, 0));

    // Reset run with a failing script: the old successes are gone
    let channel = ScriptedChannel::new(vec![
        ScriptedOutcome::feedback(&["차단된 회원입니다"]),
        ScriptedOutcome::feedback(&["차단된 회원입니다"]),
    ]);
    let mut d = dispatcher(channel, &ws);
    let params = RunParams {
        reset: true,
        ..Default::default()
    };
    d.run(&batch, &params, &RunContext::new()).await.unwrap();

    assert_eq!(ws.store().load().unwrap().counts(), (0, 0, 2));
}

#[tokio::test]
async fn test_malformed_snapshot_is_rebuilt() {
    let ws = Workspace::new("후원아이디\nviewer01\n", "hi");
    fs::write(&ws.status, "not json at all").unwrap();

    let batch = batch::load_batch(&ws.recipients, &ws.message).unwrap();
    let mut d = dispatcher(ScriptedChannel::always_success(1), &ws);
    d.run(&batch, &RunParams::default(), &RunContext::new())
        .await
        .unwrap();

    let snapshot = ws.store().load().unwrap();
    assert_eq!(snapshot.items.len(), 1);
    assert_eq!(snapshot.items[0].status, DeliveryStatus::Success);
}

#[tokio::test]
async fn test_dry_run_channel_confirms_everything() {
    let ws = Workspace::new(
        "후원아이디\nviewer01\nviewer02\nviewer03\n",
        "hi",
    );
    let batch = batch::load_batch(&ws.recipients, &ws.message).unwrap();

    let mut d = dispatcher(NullChannel::default(), &ws);
    let summary = d
        .run(&batch, &RunParams::default(), &RunContext::new())
        .await
        .unwrap();

    assert_eq!(summary.success, 3);
    assert_eq!(summary.fail, 0);
    assert_eq!(d.channel().submitted, 3);
}

#[tokio::test]
async fn test_marker_cadence_across_long_batch() {
    // 12 recipients over a two-line base: groups 0 and 1 alternate the
    // marked line, group 2 doubles the markers on line 0.
    let csv: String = std::iter::once("후원아이디".to_string())
        .chain((0..12).map(|i| format!("viewer{i:02}")))
        .collect::<Vec<_>>()
        .join("\n");
    let ws = Workspace::new(&csv, "one\ntwo");
    let batch = batch::load_batch(&ws.recipients, &ws.message).unwrap();

    let mut d = dispatcher(ScriptedChannel::always_success(12), &ws);
    d.run(&batch, &RunParams::default(), &RunContext::new())
        .await
        .unwrap();

    let m = INVISIBLE_MARKER;
    let messages: Vec<&str> = d
        .channel()
        .submissions
        .iter()
        .map(|(_, msg)| msg.as_str())
        .collect();
    assert_eq!(messages[0], format!("one{m}\ntwo"));
    assert_eq!(messages[4], format!("one{m}\ntwo"));
    assert_eq!(messages[5], format!("one\ntwo{m}"));
    assert_eq!(messages[9], format!("one\ntwo{m}"));
    assert_eq!(messages[10], format!("one{m}{m}\ntwo"));
    assert_eq!(messages[11], format!("one{m}{m}\ntwo"));
}

#[tokio::test]
async fn test_structural_fault_does_not_stop_the_run() {
    let ws = Workspace::new(
        "후원아이디\nviewer01\nviewer02\nviewer03\n",
        "hi",
    );
    let batch = batch::load_batch(&ws.recipients, &ws.message).unwrap();

    let channel = ScriptedChannel::new(vec![
        ScriptedOutcome::feedback(&["전송되었습니다"]),
        ScriptedOutcome::Structural("compose modal vanished".to_string()),
        ScriptedOutcome::feedback(&["전송되었습니다"]),
    ]);
    let mut d = dispatcher(channel, &ws);
    let summary = d
        .run(&batch, &RunParams::default(), &RunContext::new())
        .await
        .unwrap();

    assert_eq!(summary.attempted, 3);
    assert_eq!(summary.success, 2);
    assert_eq!(summary.fail, 1);
    assert!(d.channel().closed);

    let snapshot = ws.store().load().unwrap();
    assert_eq!(snapshot.items[1].status, DeliveryStatus::Fail);
}

#[tokio::test]
async fn test_snapshot_readable_by_external_poller() {
    // The dashboard reads the raw JSON; pin the field names it depends on.
    let ws = Workspace::new("후원아이디,후원하트\nviewer01,50\n", "hi");
    let batch = batch::load_batch(&ws.recipients, &ws.message).unwrap();

    let mut d = dispatcher(ScriptedChannel::always_success(1), &ws);
    d.run(&batch, &RunParams::default(), &RunContext::new())
        .await
        .unwrap();

    let raw = fs::read_to_string(&ws.status).unwrap();
    let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
    let item = &value["items"][0];
    assert_eq!(item["index"], 0);
    assert_eq!(item["id"], "viewer01");
    assert_eq!(item["status"], "success");
    assert!(item["updated"].is_string());
    assert!(value["meta"]["created"].is_string());

    // And it round-trips through the typed snapshot
    let parsed: StatusSnapshot = serde_json::from_str(&raw).unwrap();
    assert_eq!(parsed.counts(), (0, 1, 0));
}
