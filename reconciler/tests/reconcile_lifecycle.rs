//! End-to-end reconciliation scenarios driven through `reconcile`.
//!
//! Each test scripts a frame stream with the `test_support` builders and
//! checks the final text, outcome, and counters.

use reconciler::core::guard::longest_token_run;
use reconciler::core::pattern::{AnchorMode, LineBreakPolicy};
use reconciler::error::ReconcileError;
use reconciler::io::config::ReconcileConfig;
use reconciler::io::frames::{DEFAULT_CHANNEL_CAPACITY, channel, spawn_jsonl_reader};
use reconciler::looping::{reconcile, reconcile_passes};
use reconciler::test_support::{
    TestWorkspace, alternatives, context, delete, entries_group, group, insert, line_break,
    progress_frame, scripted, space, suggestion_frame, terminal_frame, too_small_frame,
};
use serde_json::Value;

const LOAN_TEXT: &str =
    "Apply for a loan. A loan is a liability that needs to be paid back. Assess it.";

/// Loan-advice paragraph with heavily repeated "loan" / "personal loan" phrasing.
const LOAN_PARAGRAPH: &str = include_str!("fixtures/loan_paragraph.txt");

fn insertion_group() -> Value {
    group(
        vec![vec![
            context("Apply"),
            space(),
            insert("only "),
            context("for a loan"),
        ]],
        Vec::new(),
    )
}

fn deletion_group() -> Value {
    group(
        vec![vec![
            context("needs to be paid"),
            delete(" back"),
            context(". Assess"),
        ]],
        Vec::new(),
    )
}

#[tokio::test]
async fn terminal_only_stream_returns_original() {
    let done = reconcile(
        LOAN_TEXT.to_string(),
        scripted(vec![terminal_frame()]),
        &ReconcileConfig::default(),
    )
    .await
    .expect("done");
    assert_eq!(done.text, LOAN_TEXT);
    assert_eq!(done.stats.patches_applied, 0);
    assert_eq!(
        done.scores.get("Correctness").and_then(Value::as_u64),
        Some(97)
    );
}

#[tokio::test]
async fn insertion_and_deletion_apply_in_one_frame() {
    let done = reconcile(
        LOAN_TEXT.to_string(),
        scripted(vec![
            progress_frame(),
            suggestion_frame(vec![insertion_group(), deletion_group()]),
            terminal_frame(),
        ]),
        &ReconcileConfig::default(),
    )
    .await
    .expect("done");
    assert_eq!(
        done.text,
        "Apply only for a loan. A loan is a liability that needs to be paid. Assess it."
    );
    assert_eq!(done.stats.frames, 3);
    assert_eq!(done.stats.progress_frames, 1);
    assert_eq!(done.stats.suggestion_frames, 1);
    assert_eq!(done.stats.groups_seen, 2);
    assert_eq!(done.stats.patches_applied, 2);
}

#[tokio::test]
async fn left_side_applies_before_right_side() {
    // The right side only matches once the left side's insertion is in place.
    let frame = suggestion_frame(vec![group(
        vec![vec![
            context("Apply"),
            space(),
            insert("only "),
            context("for a loan"),
        ]],
        vec![vec![
            context("only"),
            space(),
            insert("once "),
            context("for"),
        ]],
    )]);
    let done = reconcile(
        "Apply for a loan".to_string(),
        scripted(vec![frame, terminal_frame()]),
        &ReconcileConfig::default(),
    )
    .await
    .expect("done");
    assert_eq!(done.text, "Apply only once for a loan");
    assert_eq!(done.stats.patches_applied, 2);
    assert_eq!(done.stats.patches_unmatched, 0);
}

#[tokio::test]
async fn alternative_choice_uses_first_preview() {
    let frame = suggestion_frame(vec![entries_group(
        vec![alternatives(vec![
            vec![
                context("Apply"),
                space(),
                insert("only "),
                context("for a loan"),
            ],
            vec![
                context("Apply"),
                space(),
                insert("never "),
                context("for a loan"),
            ],
        ])],
        Vec::new(),
    )]);
    let done = reconcile(
        "Apply for a loan".to_string(),
        scripted(vec![frame, terminal_frame()]),
        &ReconcileConfig::default(),
    )
    .await
    .expect("done");
    assert_eq!(done.text, "Apply only for a loan");
}

#[tokio::test]
async fn corruption_keeps_text_from_before_offending_patch() {
    let stutter = suggestion_frame(vec![group(
        vec![vec![
            context("Read"),
            space(),
            insert("the the "),
            context("the manual"),
        ]],
        Vec::new(),
    )]);
    let failure = reconcile(
        "Read the manual. Apply for a loan".to_string(),
        scripted(vec![
            suggestion_frame(vec![insertion_group()]),
            stutter,
            terminal_frame(),
        ]),
        &ReconcileConfig::default(),
    )
    .await
    .expect_err("corruption");
    assert_eq!(failure.partial_text, "Read the manual. Apply only for a loan");
    assert_eq!(
        failure.error,
        ReconcileError::Corruption {
            token: "the".to_string(),
            run: 3
        }
    );
    assert_eq!(failure.stats.frames, 2);
}

#[tokio::test]
async fn repeated_passes_over_paragraph_are_stable() {
    // Both frames are replayed on every pass over the previous pass's output.
    let frames = || {
        vec![
            suggestion_frame(vec![
                group(
                    vec![vec![
                        context("Apply for a"),
                        space(),
                        insert("new "),
                        context("personal loan only"),
                    ]],
                    vec![vec![
                        context("needs to be paid"),
                        delete(" back"),
                        context(". Assess"),
                    ]],
                ),
                group(
                    vec![vec![
                        context("chances of getting"),
                        delete(" a"),
                        insert(" your"),
                        context(" personal loan"),
                    ]],
                    vec![vec![
                        context("a personal loan"),
                        space(),
                        insert("request "),
                        context("will be rejected"),
                    ]],
                ),
            ]),
            progress_frame(),
            suggestion_frame(vec![group(
                vec![vec![
                    context("emergency needs."),
                    line_break(),
                    context("Calculate your"),
                ]],
                vec![vec![
                    context("then apply for"),
                    space(),
                    insert("such "),
                    context("a loan."),
                ]],
            )]),
            terminal_frame(),
        ]
    };
    let outcomes = reconcile_passes(
        LOAN_PARAGRAPH.to_string(),
        3,
        &ReconcileConfig::default(),
        |_pass| scripted(frames()),
    )
    .await
    .expect("passes");
    assert_eq!(outcomes.len(), 3);

    let first = &outcomes[0];
    assert_eq!(first.stats.patches_applied, 6);
    for edited in [
        "Apply for a new personal loan only when",
        "needs to be paid. Assess your",
        "important/emergency needs.\nCalculate your",
        "application for a personal loan request will be rejected",
        "before you apply for a new one. Check your",
        "chances of getting your personal loan approved",
        "then apply for such a loan. Compare",
    ] {
        assert!(first.text.contains(edited), "missing {edited:?}");
    }

    for done in &outcomes {
        assert_eq!(done.text, first.text);
        assert!(!done.text.contains("paid back"));
        assert!(longest_token_run(&done.text) <= 2);
    }
    // The line-break anchor no longer matches once the break is in place.
    assert_eq!(outcomes[1].stats.patches_applied, 5);
    assert_eq!(outcomes[2].stats.patches_unmatched, 1);
}

#[tokio::test]
async fn line_break_follows_configured_policy() {
    let frame = || {
        suggestion_frame(vec![group(
            vec![vec![context("needs."), line_break(), context("Calculate")]],
            Vec::new(),
        )])
    };
    let original = "emergency needs. Calculate your EMIs";

    let mut config = ReconcileConfig::default();
    let done = reconcile(
        original.to_string(),
        scripted(vec![frame(), terminal_frame()]),
        &config,
    )
    .await
    .expect("newline");
    assert_eq!(done.text, "emergency needs.\nCalculate your EMIs");

    config.line_break = LineBreakPolicy::Space;
    let done = reconcile(
        original.to_string(),
        scripted(vec![frame(), terminal_frame()]),
        &config,
    )
    .await
    .expect("space");
    assert_eq!(done.text, original);

    config.line_break_override = Some("<br>".to_string());
    let done = reconcile(
        original.to_string(),
        scripted(vec![frame(), terminal_frame()]),
        &config,
    )
    .await
    .expect("override");
    assert_eq!(done.text, "emergency needs.<br>Calculate your EMIs");
}

#[tokio::test]
async fn too_small_status_is_terminal() {
    let done = reconcile(
        "hi".to_string(),
        scripted(vec![too_small_frame()]),
        &ReconcileConfig::default(),
    )
    .await
    .expect("done");
    assert_eq!(done.text, "hi");
    assert!(done.scores.is_empty());
    assert_eq!(done.status.as_deref(), Some("TOO_SMALL"));
}

#[tokio::test]
async fn bad_frames_and_bad_groups_are_skipped() {
    let config = ReconcileConfig::default();
    let broken = suggestion_frame(vec![group(
        vec![vec![
            context("EMIs (monthly"),
            insert(")"),
            context(" –"),
        ]],
        Vec::new(),
    )]);
    let done = reconcile(
        "Apply for a loan".to_string(),
        scripted(vec![
            "{not json".to_string(),
            "[1, 2]".to_string(),
            broken,
            suggestion_frame(vec![insertion_group()]),
            terminal_frame(),
        ]),
        &config,
    )
    .await
    .expect("done");
    assert_eq!(done.text, "Apply only for a loan");
    assert_eq!(done.stats.decode_errors, 2);
    assert_eq!(done.stats.compile_errors, 1);
    assert_eq!(done.stats.patches_applied, 1);
}

fn bracket_group() -> Value {
    group(
        vec![vec![
            context("EMIs (monthly"),
            insert(")"),
            context(" –"),
        ]],
        Vec::new(),
    )
}

#[tokio::test]
async fn unbalanced_anchor_skips_group_by_default() {
    let done = reconcile(
        "Check EMIs (monthly – now".to_string(),
        scripted(vec![suggestion_frame(vec![bracket_group()]), terminal_frame()]),
        &ReconcileConfig::default(),
    )
    .await
    .expect("done");
    assert_eq!(done.text, "Check EMIs (monthly – now");
    assert_eq!(done.stats.compile_errors, 1);
    assert_eq!(done.stats.patches_applied, 0);
}

#[tokio::test]
async fn literal_anchor_mode_matches_metacharacters() {
    let config = ReconcileConfig {
        anchor_mode: AnchorMode::Literal,
        ..ReconcileConfig::default()
    };
    let done = reconcile(
        "Check EMIs (monthly – now".to_string(),
        scripted(vec![suggestion_frame(vec![bracket_group()]), terminal_frame()]),
        &config,
    )
    .await
    .expect("done");
    assert_eq!(done.text, "Check EMIs (monthly) – now");
    assert_eq!(done.stats.compile_errors, 0);
}

#[tokio::test]
async fn non_utf8_frame_line_is_skipped() {
    let workspace = TestWorkspace::new().expect("workspace");
    let mut jsonl = b"{\"messageId\":\"x\xff\"}\n".to_vec();
    for frame in [suggestion_frame(vec![insertion_group()]), terminal_frame()] {
        jsonl.extend_from_slice(frame.as_bytes());
        jsonl.push(b'\n');
    }
    let path = workspace
        .write_bytes("frames.jsonl", &jsonl)
        .expect("frames");

    let (sender, receiver) = channel(DEFAULT_CHANNEL_CAPACITY);
    spawn_jsonl_reader(path, sender);
    let done = reconcile(
        "Apply for a loan".to_string(),
        receiver.into_stream(),
        &ReconcileConfig::default(),
    )
    .await
    .expect("done");
    assert_eq!(done.text, "Apply only for a loan");
    assert_eq!(done.stats.decode_errors, 1);
    assert_eq!(done.stats.frames, 3);
}

#[tokio::test]
async fn stream_ending_without_terminal_is_transport_failure() {
    let failure = reconcile(
        LOAN_TEXT.to_string(),
        scripted(vec![suggestion_frame(vec![deletion_group()])]),
        &ReconcileConfig::default(),
    )
    .await
    .expect_err("closed");
    assert_eq!(
        failure.partial_text,
        "Apply for a loan. A loan is a liability that needs to be paid. Assess it."
    );
    assert!(failure.error.is_fatal());
    assert!(matches!(failure.error, ReconcileError::Transport(_)));
}
