use std::path::PathBuf;
use std::sync::Once;

use pretty_assertions::assert_eq;
use timelapse_core::{
    update, AppState, Effect, FailureKind, Msg, NoticeLevel, PreviewId, ProcessingOptions,
    Quality, ResultResource, SelectedFile, SpeedMultiplier, Stage, SubmissionFailure,
    SubmissionState, UploadRequest, PROGRESS_CAP,
};

fn init_logging() {
    static INIT: Once = Once::new();
    INIT.call_once(timelapse_logging::initialize_for_tests);
}

fn ready_state() -> AppState {
    let file = SelectedFile::new("/videos/sunset.mp4", 10_000);
    let (state, _) = update(AppState::new(), Msg::FileSelected(Some(file)));
    state
}

fn submitted_state() -> AppState {
    let (state, _) = update(ready_state(), Msg::SubmitClicked);
    state
}

fn success(url: &str) -> Result<ResultResource, SubmissionFailure> {
    Ok(ResultResource::parse(url).unwrap())
}

fn network_failure() -> Result<ResultResource, SubmissionFailure> {
    Err(SubmissionFailure::new(
        FailureKind::Network,
        "connection refused",
    ))
}

#[test]
fn submit_without_file_is_noop() {
    init_logging();
    let state = AppState::new();
    let before = state.clone();

    let (mut next, effects) = update(state, Msg::SubmitClicked);

    assert!(effects.is_empty());
    assert_eq!(next, before);
    assert!(!next.consume_dirty());
    assert!(matches!(next.submission(), SubmissionState::Idle));
}

#[test]
fn submit_emits_progress_and_upload_with_options() {
    init_logging();
    let (state, _) = update(ready_state(), Msg::SpeedPresetSelected(8));
    let (state, _) = update(state, Msg::QualitySelected(Quality::Low));
    let (state, _) = update(state, Msg::RemoveAudioToggled(false));

    let (state, effects) = update(state, Msg::SubmitClicked);

    assert_eq!(state.view().stage, Stage::Submitting);
    assert!(state.view().show_progress);
    assert_eq!(state.view().progress, 0.0);
    assert!(!state.view().can_submit);
    assert_eq!(
        effects,
        vec![
            Effect::StartProgress { submission: 1 },
            Effect::Submit {
                submission: 1,
                request: UploadRequest {
                    path: PathBuf::from("/videos/sunset.mp4"),
                    file_name: "sunset.mp4".to_string(),
                    mime_type: "video/mp4",
                    options: ProcessingOptions {
                        speed: SpeedMultiplier::new(8).unwrap(),
                        quality: Quality::Low,
                        remove_audio: false,
                    },
                },
            },
        ]
    );
}

#[test]
fn second_submit_while_in_flight_is_ignored() {
    init_logging();
    let state = submitted_state();
    let before = state.clone();

    let (next, effects) = update(state, Msg::SubmitClicked);

    assert!(effects.is_empty());
    assert_eq!(next, before);
}

#[test]
fn selection_is_locked_while_submitting() {
    init_logging();
    let state = submitted_state();

    let (state, effects) = update(state, Msg::BrowseClicked);
    assert!(effects.is_empty());

    let other = SelectedFile::new("/videos/other.mp4", 10);
    let (state, effects) = update(state, Msg::FileSelected(Some(other)));
    assert!(effects.is_empty());
    assert_eq!(state.view().file_name.as_deref(), Some("sunset.mp4"));
    assert_eq!(state.view().stage, Stage::Submitting);
}

#[test]
fn progress_is_capped_at_ninety_and_stops_simulator() {
    init_logging();
    let mut state = submitted_state();
    let mut stop_effects = Vec::new();

    for _ in 0..30 {
        let (next, effects) = update(
            state,
            Msg::ProgressTick {
                submission: 1,
                increment: 9.5,
            },
        );
        state = next;
        stop_effects.extend(effects);
        let view = state.view();
        assert_eq!(view.stage, Stage::Submitting);
        assert!(view.progress <= PROGRESS_CAP);
    }

    assert_eq!(state.view().progress, PROGRESS_CAP);
    assert_eq!(stop_effects, vec![Effect::StopProgress { submission: 1 }]);
}

#[test]
fn progress_ignores_invalid_and_stale_ticks() {
    init_logging();
    let state = submitted_state();

    let (state, _) = update(
        state,
        Msg::ProgressTick {
            submission: 1,
            increment: -5.0,
        },
    );
    let (state, _) = update(
        state,
        Msg::ProgressTick {
            submission: 1,
            increment: f32::NAN,
        },
    );
    let (state, _) = update(
        state,
        Msg::ProgressTick {
            submission: 99,
            increment: 5.0,
        },
    );
    assert_eq!(state.view().progress, 0.0);

    let (state, _) = update(
        state,
        Msg::ProgressTick {
            submission: 1,
            increment: 3.0,
        },
    );
    assert_eq!(state.view().progress, 3.0);
}

#[test]
fn success_response_stores_result_and_completes_progress() {
    init_logging();
    let state = submitted_state();

    let (state, effects) = update(
        state,
        Msg::SubmissionCompleted {
            submission: 1,
            outcome: success("http://host/out.mp4"),
        },
    );
    let view = state.view();

    assert_eq!(view.stage, Stage::Succeeded);
    assert_eq!(view.result_url.as_deref(), Some("http://host/out.mp4"));
    assert_eq!(view.progress, 100.0);
    assert!(!view.show_progress);
    assert_eq!(effects, vec![Effect::StopProgress { submission: 1 }]);
}

#[test]
fn progress_is_one_hundred_only_when_succeeded() {
    init_logging();
    let state = submitted_state();
    let (state, _) = update(
        state,
        Msg::SubmissionCompleted {
            submission: 1,
            outcome: network_failure(),
        },
    );

    assert_eq!(state.view().stage, Stage::Failed);
    assert_eq!(state.view().progress, 0.0);
    assert_eq!(state.view().result_url, None);
}

#[test]
fn network_failure_preserves_selection_for_retry() {
    init_logging();
    let state = submitted_state();

    let (state, effects) = update(
        state,
        Msg::SubmissionCompleted {
            submission: 1,
            outcome: network_failure(),
        },
    );
    let view = state.view();

    assert_eq!(effects, vec![Effect::StopProgress { submission: 1 }]);
    assert_eq!(view.stage, Stage::Failed);
    assert_eq!(view.result_url, None);
    assert_eq!(view.file_name.as_deref(), Some("sunset.mp4"));
    assert!(view.can_submit);
    let notice = view.notice.expect("failure notice");
    assert_eq!(notice.level, NoticeLevel::Error);
    assert!(notice.text.contains("Could not reach"));

    // Retry without re-selecting.
    let (state, effects) = update(state, Msg::SubmitClicked);
    assert_eq!(state.view().stage, Stage::Submitting);
    assert!(state.view().notice.is_none());
    assert!(matches!(
        effects.as_slice(),
        [
            Effect::StartProgress { submission: 2 },
            Effect::Submit { submission: 2, .. }
        ]
    ));
}

#[test]
fn server_error_notice_includes_status_and_message() {
    init_logging();
    let (state, _) = update(
        submitted_state(),
        Msg::SubmissionCompleted {
            submission: 1,
            outcome: Err(SubmissionFailure::new(
                FailureKind::Server {
                    status: 500,
                    message: Some("Video processing failed".to_string()),
                },
                "500 Internal Server Error",
            )),
        },
    );

    let text = state.view().notice.unwrap().text;
    assert!(text.contains("500"));
    assert!(text.contains("Video processing failed"));
}

#[test]
fn reset_mid_submission_cancels_and_suppresses_late_completion() {
    init_logging();
    let state = submitted_state();

    let (state, effects) = update(state, Msg::ResetClicked);
    assert_eq!(
        effects,
        vec![
            Effect::CancelSubmission { submission: 1 },
            Effect::StopProgress { submission: 1 },
            Effect::ReleasePreview {
                preview: PreviewId(1)
            },
        ]
    );
    let mut state = state;
    assert_eq!(state.view(), AppState::new().view());
    assert!(state.consume_dirty());

    // A late callback from the abandoned upload must not resurrect state.
    let (mut state, effects) = update(
        state,
        Msg::SubmissionCompleted {
            submission: 1,
            outcome: success("http://host/out.mp4"),
        },
    );
    assert!(effects.is_empty());
    assert!(!state.consume_dirty());
    assert_eq!(state.view(), AppState::new().view());

    let (state, effects) = update(
        state,
        Msg::ProgressTick {
            submission: 1,
            increment: 5.0,
        },
    );
    assert!(effects.is_empty());
    assert_eq!(state.view().progress, 0.0);
}

#[test]
fn completion_of_previous_submission_is_ignored_after_resubmit() {
    init_logging();
    let state = submitted_state();
    let (state, _) = update(
        state,
        Msg::SubmissionCompleted {
            submission: 1,
            outcome: network_failure(),
        },
    );
    let (state, _) = update(state, Msg::SubmitClicked);

    let (state, effects) = update(
        state,
        Msg::SubmissionCompleted {
            submission: 1,
            outcome: success("http://host/stale.mp4"),
        },
    );
    assert!(effects.is_empty());
    assert_eq!(state.view().stage, Stage::Submitting);
}

#[test]
fn reset_is_idempotent() {
    init_logging();
    let (state, _) = update(
        submitted_state(),
        Msg::SubmissionCompleted {
            submission: 1,
            outcome: success("http://host/out.mp4"),
        },
    );

    let (mut once, first_effects) = update(state, Msg::ResetClicked);
    assert!(once.consume_dirty());
    let (mut twice, second_effects) = update(once.clone(), Msg::ResetClicked);

    assert_eq!(
        first_effects,
        vec![Effect::ReleasePreview {
            preview: PreviewId(1)
        }]
    );
    assert!(second_effects.is_empty());
    assert_eq!(twice.view(), once.view());
    assert_eq!(twice.view().stage, Stage::Idle);
    assert_eq!(twice.view().result_url, None);
    assert!(!twice.consume_dirty());
}

#[test]
fn new_selection_after_success_discards_result() {
    init_logging();
    let (state, _) = update(
        submitted_state(),
        Msg::SubmissionCompleted {
            submission: 1,
            outcome: success("http://host/out.mp4"),
        },
    );

    let file = SelectedFile::new("/videos/next.webm", 50);
    let (state, _) = update(state, Msg::FileSelected(Some(file)));

    assert_eq!(state.view().stage, Stage::Ready);
    assert_eq!(state.view().result_url, None);
}

#[test]
fn submit_with_picker_open_shows_progress_then_result() {
    init_logging();
    let (state, _) = update(ready_state(), Msg::BrowseClicked);
    assert_eq!(state.view().stage, Stage::Selecting);

    let (state, effects) = update(state, Msg::SubmitClicked);
    assert_eq!(effects.len(), 2);
    let view = state.view();
    assert_eq!(view.stage, Stage::Submitting);
    assert!(view.show_progress);

    let (state, _) = update(
        state,
        Msg::SubmissionCompleted {
            submission: 1,
            outcome: success("http://host/out.mp4"),
        },
    );
    let view = state.view();
    assert_eq!(view.stage, Stage::Succeeded);
    assert!(!view.show_progress);

    // The late picker answer changes nothing.
    let (state, effects) = update(state, Msg::FileSelected(None));
    assert!(effects.is_empty());
    assert_eq!(state.view().stage, Stage::Succeeded);
}
