use timelapse_logging::tl_debug;

use crate::{AppState, Effect, Msg, SpeedMultiplier};

/// Pure update function: applies a message to state and returns any effects.
pub fn update(mut state: AppState, msg: Msg) -> (AppState, Vec<Effect>) {
    let effects = match msg {
        Msg::BrowseClicked => {
            // The selection is locked while an upload is outstanding.
            if state.is_submitting() {
                return (state, Vec::new());
            }
            state.begin_selecting();
            vec![Effect::OpenFilePicker]
        }
        Msg::FileSelected(None) => {
            state.cancel_selecting();
            Vec::new()
        }
        Msg::FileSelected(Some(file)) => {
            if state.is_submitting() {
                tl_debug!("Ignoring selection of {:?} while submitting", file.path);
                state.cancel_selecting();
                return (state, Vec::new());
            }
            state.select_file(file)
        }
        Msg::PreviewLoaded { preview, summary } => {
            state.attach_preview_summary(preview, summary);
            Vec::new()
        }
        Msg::SpeedPresetSelected(speed) => {
            state.set_speed(SpeedMultiplier::new(i64::from(speed)));
            Vec::new()
        }
        Msg::CustomSpeedEntered(raw) => {
            state.set_speed(raw.parse());
            Vec::new()
        }
        Msg::QualitySelected(quality) => {
            state.set_quality(quality);
            Vec::new()
        }
        Msg::RemoveAudioToggled(remove_audio) => {
            state.set_remove_audio(remove_audio);
            Vec::new()
        }
        Msg::SubmitClicked => {
            if state.is_submitting() {
                tl_debug!("Submit ignored: a submission is already in flight");
                return (state, Vec::new());
            }
            let abandoned = state.abandon_download();
            match state.start_submission() {
                Some((submission, request)) => {
                    let mut effects: Vec<Effect> = abandoned.into_iter().collect();
                    effects.push(Effect::StartProgress { submission });
                    effects.push(Effect::Submit {
                        submission,
                        request,
                    });
                    effects
                }
                None => Vec::new(),
            }
        }
        Msg::ProgressTick {
            submission,
            increment,
        } => {
            if state.apply_tick(submission, increment) {
                vec![Effect::StopProgress { submission }]
            } else {
                Vec::new()
            }
        }
        Msg::SubmissionCompleted {
            submission,
            outcome,
        } => {
            if state.complete_submission(submission, outcome) {
                vec![Effect::StopProgress { submission }]
            } else {
                Vec::new()
            }
        }
        Msg::ResetClicked => state.reset(),
        Msg::DownloadClicked => match state.begin_download() {
            Some(url) => vec![Effect::DownloadResult { url }],
            None => Vec::new(),
        },
        Msg::DownloadFinished { url, result } => {
            state.finish_download(&url, result);
            Vec::new()
        }
        Msg::Tick => Vec::new(),
    };

    (state, effects)
}
