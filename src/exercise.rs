use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Exercises the analysis backend knows how to score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum ExerciseType {
    #[default]
    Squat,
    #[value(alias = "push-up")]
    Pushup,
    Lunge,
    Deadlift,
    #[value(name = "shoulder_press", alias = "shoulder-press")]
    ShoulderPress,
}

impl ExerciseType {
    /// Full catalog in display order
    pub const ALL: [ExerciseType; 5] = [
        ExerciseType::Squat,
        ExerciseType::Pushup,
        ExerciseType::Lunge,
        ExerciseType::Deadlift,
        ExerciseType::ShoulderPress,
    ];

    /// Value sent in the `exercise_type` multipart field
    pub fn as_str(&self) -> &'static str {
        match self {
            ExerciseType::Squat => "squat",
            ExerciseType::Pushup => "pushup",
            ExerciseType::Lunge => "lunge",
            ExerciseType::Deadlift => "deadlift",
            ExerciseType::ShoulderPress => "shoulder_press",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ExerciseType::Squat => "Squat",
            ExerciseType::Pushup => "Push-up",
            ExerciseType::Lunge => "Lunge",
            ExerciseType::Deadlift => "Deadlift",
            ExerciseType::ShoulderPress => "Shoulder Press",
        }
    }
}

impl fmt::Display for ExerciseType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("Unknown exercise type '{0}'")]
pub struct UnknownExercise(pub String);

impl FromStr for ExerciseType {
    type Err = UnknownExercise;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase().replace('-', "_");
        match normalized.as_str() {
            "squat" => Ok(ExerciseType::Squat),
            "pushup" | "push_up" => Ok(ExerciseType::Pushup),
            "lunge" => Ok(ExerciseType::Lunge),
            "deadlift" => Ok(ExerciseType::Deadlift),
            "shoulder_press" => Ok(ExerciseType::ShoulderPress),
            _ => Err(UnknownExercise(s.to_string())),
        }
    }
}
