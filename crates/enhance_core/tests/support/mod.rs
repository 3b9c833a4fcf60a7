#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::Once;

use enhance_core::{update, Animation, AppState, Effect, JobId, Msg, SelectedInput};

pub fn init_logging() {
    static INIT: Once = Once::new();
    INIT.call_once(engine_logging::initialize_for_tests);
}

pub fn wav_input(name: &str) -> SelectedInput {
    SelectedInput::File {
        path: PathBuf::from(format!("/audio/{name}")),
        file_name: name.to_string(),
        size_bytes: 48_000,
    }
}

/// Selects `name`, clicks Enhance and returns the id of the new job.
pub fn start_job(state: AppState, name: &str) -> (AppState, JobId, Vec<Effect>) {
    let (state, _) = update(state, Msg::InputSelected(wav_input(name)));
    let (state, effects) = update(state, Msg::EnhanceClicked);
    let job_id = effects
        .iter()
        .find_map(|effect| match effect {
            Effect::Upload { job_id, .. } => Some(*job_id),
            _ => None,
        })
        .expect("upload effect");
    (state, job_id, effects)
}

/// A job that has been accepted by the server and is being polled.
pub fn polling_job(name: &str, processing_id: &str) -> (AppState, JobId) {
    let (state, job_id, _) = start_job(AppState::new(), name);
    let (state, _) = update(
        state,
        Msg::UploadAccepted {
            job_id,
            processing_id: processing_id.to_string(),
        },
    );
    (state, job_id)
}

pub fn animation_in(effects: &[Effect]) -> Option<Animation> {
    effects.iter().find_map(|effect| match effect {
        Effect::AnimateProgress(animation) => Some(*animation),
        _ => None,
    })
}

/// Feeds every frame of `animation` back into the state.
pub fn play_animation(mut state: AppState, animation: Animation) -> AppState {
    for step in 1..=animation.steps {
        let (next, _) = update(
            state,
            Msg::ProgressFrame {
                generation: animation.generation,
                step,
            },
        );
        state = next;
    }
    state
}

pub fn polls_in(effects: &[Effect]) -> usize {
    effects
        .iter()
        .filter(|effect| matches!(effect, Effect::SchedulePoll { .. }))
        .count()
}
