use std::{io, path::Path};

use finger_core::{PointCoordinates, Real};

#[derive(Clone, Debug, PartialEq)]
pub struct StepRecord {
    pub joint_positions: Vec<Real>,
    pub tip_positions: Vec<PointCoordinates>,
    // seconds since the unix epoch
    pub timestamp: f64,
}

#[derive(Clone, Debug, PartialEq)]
pub struct EpisodeLog {
    pub object_initial_position: PointCoordinates,
    pub goal: PointCoordinates,
    pub steps: Vec<StepRecord>,
}

/// Per-episode record of the finger state, for offline inspection.
#[derive(Clone, Debug, Default)]
pub struct DataLogger {
    episodes: Vec<EpisodeLog>,
}

impl DataLogger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn new_episode(&mut self, object_initial_position: PointCoordinates, goal: PointCoordinates) {
        self.episodes.push(EpisodeLog {
            object_initial_position,
            goal,
            steps: Vec::new(),
        });
    }

    /// Adds a step to the current episode. Ignored before the first episode.
    pub fn append(&mut self, joint_positions: &[Real], tip_positions: &[PointCoordinates], timestamp: f64) {
        let Some(episode) = self.episodes.last_mut() else {
            log::warn!("step logged before any episode started");
            return;
        };
        episode.steps.push(StepRecord {
            joint_positions: joint_positions.to_vec(),
            tip_positions: tip_positions.to_vec(),
            timestamp,
        });
    }

    pub fn episodes(&self) -> &[EpisodeLog] {
        &self.episodes
    }

    pub fn clear(&mut self) {
        self.episodes.clear();
    }

    /// One row per logged step, episode constants repeated on every row.
    pub fn write_csv<W: io::Write>(&self, writer: W) -> csv::Result<()> {
        let mut writer = csv::Writer::from_writer(writer);

        let (joints, tips) = self
            .episodes
            .iter()
            .flat_map(|episode| episode.steps.first())
            .map(|step| (step.joint_positions.len(), step.tip_positions.len()))
            .next()
            .unwrap_or((0, 0));

        let mut header: Vec<String> = ["episode", "step", "timestamp"]
            .into_iter()
            .map(String::from)
            .collect();
        for name in ["object", "goal"] {
            header.extend(["x", "y", "z"].map(|axis| format!("{name}_{axis}")));
        }
        header.extend((0..joints).map(|j| format!("joint_{j}")));
        for t in 0..tips {
            header.extend(["x", "y", "z"].map(|axis| format!("tip_{t}_{axis}")));
        }
        writer.write_record(&header)?;

        for (e, episode) in self.episodes.iter().enumerate() {
            for (s, step) in episode.steps.iter().enumerate() {
                let mut row = vec![e.to_string(), s.to_string(), step.timestamp.to_string()];
                for point in [episode.object_initial_position, episode.goal] {
                    row.extend(point.iter().map(Real::to_string));
                }
                row.extend(step.joint_positions.iter().map(Real::to_string));
                for tip in &step.tip_positions {
                    row.extend(tip.iter().map(Real::to_string));
                }
                writer.write_record(&row)?;
            }
        }
        writer.flush()?;
        Ok(())
    }

    pub fn save_csv(&self, path: impl AsRef<Path>) -> csv::Result<()> {
        let file = std::fs::File::create(path)?;
        self.write_csv(io::BufWriter::new(file))
    }
}
