//! [`BrainController`] – learned policy served over HTTP.
//!
//! Each tick posts the ball observation to `<endpoint>/v1/prediction`:
//!
//! ```json
//! {"ball_x": 0.01, "ball_y": -0.02, "ball_vel_x": 0.0, "ball_vel_y": 0.1}
//! ```
//!
//! and expects normalised plate commands back:
//!
//! ```json
//! {"input_pitch": 0.25, "input_roll": -0.5}
//! ```
//!
//! which are clipped to `[-1, 1]` and scaled by the configured max angle.
//!
//! The round-trip runs on a private single-threaded Tokio runtime under
//! [`tokio::time::timeout`].  When the deadline passes the request future is
//! dropped, cancelling it, and the tick falls back to a level plate.  Any
//! other failure (connection refused, HTTP error status, malformed body)
//! falls back the same way; the loop keeps running.

use std::time::Duration;

use moab_types::{Action, MoabError, State};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::BrainConfig;
use crate::controller::Controller;

/// Why a single prediction failed.
#[derive(Error, Debug)]
pub enum BrainError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("no prediction within {0:?}")]
    Timeout(Duration),
    #[error("unexpected prediction: {0}")]
    BadResponse(String),
}

impl From<BrainError> for MoabError {
    fn from(e: BrainError) -> Self {
        MoabError::ControllerInference(e.to_string())
    }
}

#[derive(Debug, Serialize)]
struct Observation {
    ball_x: f32,
    ball_y: f32,
    ball_vel_x: f32,
    ball_vel_y: f32,
}

#[derive(Debug, Deserialize)]
struct Prediction {
    input_pitch: f32,
    input_roll: f32,
}

pub struct BrainController {
    url: String,
    max_angle: f32,
    timeout: Duration,
    client: reqwest::Client,
    runtime: tokio::runtime::Runtime,
    failures: u64,
}

impl BrainController {
    /// Build the HTTP client and its runtime.  No request is made.
    ///
    /// # Errors
    ///
    /// Returns [`MoabError::ControllerInit`] if the runtime or client cannot
    /// be created.
    pub fn new(config: BrainConfig) -> Result<Self, MoabError> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| MoabError::ControllerInit(format!("tokio runtime: {e}")))?;
        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| MoabError::ControllerInit(format!("http client: {e}")))?;
        Ok(Self {
            url: format!("{}/v1/prediction", config.endpoint.trim_end_matches('/')),
            max_angle: config.max_angle,
            timeout: config.timeout,
            client,
            runtime,
            failures: 0,
        })
    }

    /// Number of ticks that fell back to a level plate.
    pub fn failures(&self) -> u64 {
        self.failures
    }

    /// Ask the policy for an action.
    ///
    /// # Errors
    ///
    /// Returns a [`BrainError`] on timeout, transport failure or a malformed
    /// response.
    pub fn predict(&self, state: &State) -> Result<Action, BrainError> {
        let observation = Observation {
            ball_x: state.x,
            ball_y: state.y,
            ball_vel_x: state.vel_x,
            ball_vel_y: state.vel_y,
        };
        let prediction = self
            .runtime
            .block_on(async {
                tokio::time::timeout(self.timeout, self.request(&observation)).await
            })
            .map_err(|_| BrainError::Timeout(self.timeout))??;

        if !(prediction.input_pitch.is_finite() && prediction.input_roll.is_finite()) {
            return Err(BrainError::BadResponse(format!("{prediction:?}")));
        }
        Ok(Action::new(
            prediction.input_pitch.clamp(-1.0, 1.0) * self.max_angle,
            prediction.input_roll.clamp(-1.0, 1.0) * self.max_angle,
        ))
    }

    async fn request(&self, observation: &Observation) -> Result<Prediction, BrainError> {
        let prediction = self
            .client
            .post(&self.url)
            .json(observation)
            .send()
            .await?
            .error_for_status()?
            .json::<Prediction>()
            .await?;
        Ok(prediction)
    }
}

impl Controller for BrainController {
    fn name(&self) -> &str {
        "brain"
    }

    fn invoke(&mut self, state: &State) -> Action {
        if !state.ball_detected {
            return Action::neutral();
        }
        match self.predict(state) {
            Ok(action) => {
                debug!(pitch = action.pitch, roll = action.roll, "brain prediction");
                action
            }
            Err(e) => {
                self.failures += 1;
                let err = MoabError::from(e);
                warn!(error = %err, failures = self.failures, "falling back to level plate");
                Action::neutral()
            }
        }
    }
}
