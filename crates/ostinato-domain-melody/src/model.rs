use std::time::Duration;

use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Step {
    /// `None` is a rest.
    pub note: Option<u8>,
    pub duration: Duration,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Melody {
    pub name: String,
    pub steps: Vec<Step>,
}

impl Melody {
    pub fn new(name: &str, steps: Vec<Step>) -> Self {
        Self {
            name: name.to_string(),
            steps,
        }
    }

    /// Builds a melody where every step lasts `step_duration`.
    pub fn from_notes(name: &str, notes: &[Option<u8>], step_duration: Duration) -> Self {
        let steps = notes
            .iter()
            .map(|&note| Step {
                note,
                duration: step_duration,
            })
            .collect();
        Self::new(name, steps)
    }

    /// One octave of C major starting at middle C, ending on a rest.
    pub fn c_major_scale(step_duration: Duration) -> Self {
        let notes: Vec<Option<u8>> = [60u8, 62, 64, 65, 67, 69, 71, 72]
            .into_iter()
            .map(Some)
            .chain(std::iter::once(None))
            .collect();
        Self::from_notes("C major scale", &notes, step_duration)
    }

    pub fn total_duration(&self) -> Duration {
        self.steps.iter().map(|step| step.duration).sum()
    }
}
