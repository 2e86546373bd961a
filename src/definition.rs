//! Exercise definitions
//!
//! Static description of each supported exercise: which joints must be
//! visible, the target angle ranges the rules classify against, which state
//! transition counts as a repetition, and how many points a completion earns.
//! Definitions are immutable once loaded and shared by reference between the
//! stages of a session.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::error::ComputeError;
use crate::exercises::ExerciseKind;
use crate::pose::KeypointName;
use crate::types::{AngleName, ExerciseState};

/// Inclusive target range for a joint angle, in degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AngleRange {
    pub min: f64,
    pub max: f64,
}

impl AngleRange {
    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    pub fn contains(&self, degrees: f64) -> bool {
        degrees >= self.min && degrees <= self.max
    }
}

/// State transition that counts as one repetition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepTransition {
    pub from: ExerciseState,
    pub to: ExerciseState,
}

/// Immutable description of one exercise type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExerciseDefinition {
    pub id: ExerciseKind,
    pub name: String,
    pub description: String,
    pub instructions: String,
    /// Coaching tip shown alongside the instructions
    #[serde(default)]
    pub tip: String,
    /// Joints that must be visible for a frame to be analysed
    pub required_keypoints: Vec<KeypointName>,
    /// Target range per named angle
    pub target_angles: BTreeMap<AngleName, AngleRange>,
    /// Transition counted as a rep; `None` for hold-only exercises
    #[serde(default)]
    pub rep_transition: Option<RepTransition>,
    /// Validated state whose duration is accumulated as hold time
    #[serde(default)]
    pub hold_state: Option<ExerciseState>,
    /// Points awarded when a challenge with this exercise is completed
    pub points: u32,
}

impl ExerciseDefinition {
    pub fn range(&self, name: AngleName) -> Option<AngleRange> {
        self.target_angles.get(&name).copied()
    }

    /// Check definition invariants and that the exercise rules can run against it
    pub fn validate(&self) -> Result<(), ComputeError> {
        let id = self.id.as_str();

        if self.required_keypoints.is_empty() {
            return Err(ComputeError::InvalidDefinition(format!(
                "{id}: required_keypoints must not be empty"
            )));
        }

        for (name, range) in &self.target_angles {
            if !(range.min < range.max) {
                return Err(ComputeError::InvalidDefinition(format!(
                    "{id}: {} range min ({}) must be below max ({})",
                    name.as_str(),
                    range.min,
                    range.max
                )));
            }
        }

        for name in self.id.rules().required_ranges() {
            if !self.target_angles.contains_key(name) {
                return Err(ComputeError::InvalidDefinition(format!(
                    "{id}: missing target range for {}",
                    name.as_str()
                )));
            }
        }

        if let Some(transition) = self.rep_transition {
            if transition.from == transition.to {
                return Err(ComputeError::InvalidDefinition(format!(
                    "{id}: rep transition must change state"
                )));
            }
        }

        Ok(())
    }
}

/// Lookup table from exercise id to its definition
#[derive(Debug, Clone)]
pub struct ExerciseRegistry {
    definitions: Vec<Arc<ExerciseDefinition>>,
}

impl Default for ExerciseRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

impl ExerciseRegistry {
    /// The four exercises shipped with the app
    pub fn builtin() -> Self {
        Self {
            definitions: builtin_definitions().into_iter().map(Arc::new).collect(),
        }
    }

    /// Build a registry from definitions, validating each one
    pub fn new(definitions: Vec<ExerciseDefinition>) -> Result<Self, ComputeError> {
        let mut seen = Vec::with_capacity(definitions.len());
        for definition in &definitions {
            definition.validate()?;
            if seen.contains(&definition.id) {
                return Err(ComputeError::InvalidDefinition(format!(
                    "{}: defined more than once",
                    definition.id.as_str()
                )));
            }
            seen.push(definition.id);
        }

        Ok(Self {
            definitions: definitions.into_iter().map(Arc::new).collect(),
        })
    }

    /// Load a registry from a JSON array of definitions
    pub fn from_json(json: &str) -> Result<Self, ComputeError> {
        let definitions: Vec<ExerciseDefinition> = serde_json::from_str(json)?;
        Self::new(definitions)
    }

    pub fn to_json(&self) -> Result<String, ComputeError> {
        let definitions: Vec<&ExerciseDefinition> =
            self.definitions.iter().map(|d| d.as_ref()).collect();
        serde_json::to_string_pretty(&definitions)
            .map_err(|e| ComputeError::EncodingError(e.to_string()))
    }

    pub fn get(&self, kind: ExerciseKind) -> Option<Arc<ExerciseDefinition>> {
        self.definitions.iter().find(|d| d.id == kind).cloned()
    }

    /// Look up a definition by its string id (e.g. "pushup")
    pub fn find(&self, id: &str) -> Result<Arc<ExerciseDefinition>, ComputeError> {
        let kind: ExerciseKind = id.parse()?;
        self.get(kind)
            .ok_or_else(|| ComputeError::UnknownExercise(id.to_string()))
    }

    pub fn definitions(&self) -> impl Iterator<Item = &ExerciseDefinition> {
        self.definitions.iter().map(|d| d.as_ref())
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }
}

const ARM_JOINTS: [KeypointName; 6] = [
    KeypointName::LeftShoulder,
    KeypointName::LeftElbow,
    KeypointName::LeftWrist,
    KeypointName::RightShoulder,
    KeypointName::RightElbow,
    KeypointName::RightWrist,
];

const LEG_JOINTS: [KeypointName; 6] = [
    KeypointName::LeftHip,
    KeypointName::LeftKnee,
    KeypointName::LeftAnkle,
    KeypointName::RightHip,
    KeypointName::RightKnee,
    KeypointName::RightAnkle,
];

const DOWN_UP: RepTransition = RepTransition {
    from: ExerciseState::Down,
    to: ExerciseState::Up,
};

fn ranges(entries: &[(AngleName, f64, f64)]) -> BTreeMap<AngleName, AngleRange> {
    entries
        .iter()
        .map(|&(name, min, max)| (name, AngleRange::new(min, max)))
        .collect()
}

fn builtin_definitions() -> Vec<ExerciseDefinition> {
    let plank_joints = ARM_JOINTS
        .iter()
        .copied()
        .chain([
            KeypointName::LeftHip,
            KeypointName::RightHip,
            KeypointName::LeftAnkle,
            KeypointName::RightAnkle,
        ])
        .collect();

    vec![
        ExerciseDefinition {
            id: ExerciseKind::Pushup,
            name: "Push-ups".to_string(),
            description: "Upper body strength exercise".to_string(),
            instructions: "Keep your back straight and lower your chest until your elbows form 90 degrees".to_string(),
            tip: "Keep your core tight and body straight throughout the movement".to_string(),
            required_keypoints: ARM_JOINTS.to_vec(),
            target_angles: ranges(&[
                (AngleName::Elbow, 60.0, 130.0),
                (AngleName::Back, 150.0, 210.0),
            ]),
            rep_transition: Some(DOWN_UP),
            hold_state: None,
            points: 100,
        },
        ExerciseDefinition {
            id: ExerciseKind::Squat,
            name: "Squats".to_string(),
            description: "Lower body strength exercise".to_string(),
            instructions: "Keep your back straight and lower your body until thighs are parallel to ground".to_string(),
            tip: "Keep your chest up, knees aligned with toes, and maintain proper depth".to_string(),
            required_keypoints: LEG_JOINTS.to_vec(),
            target_angles: ranges(&[
                (AngleName::Knee, 70.0, 120.0),
                (AngleName::Hip, 60.0, 120.0),
            ]),
            rep_transition: Some(DOWN_UP),
            hold_state: None,
            points: 150,
        },
        ExerciseDefinition {
            id: ExerciseKind::Lunges,
            name: "Lunges".to_string(),
            description: "Lower body and balance exercise".to_string(),
            instructions: "Step forward and lower your back knee towards the ground".to_string(),
            tip: "Keep your upper body straight, step forward with control".to_string(),
            required_keypoints: LEG_JOINTS.to_vec(),
            target_angles: ranges(&[
                (AngleName::FrontKnee, 80.0, 110.0),
                (AngleName::BackKnee, 80.0, 110.0),
                (AngleName::Torso, 155.0, 205.0),
            ]),
            rep_transition: Some(DOWN_UP),
            hold_state: None,
            points: 120,
        },
        ExerciseDefinition {
            id: ExerciseKind::Plank,
            name: "Plank".to_string(),
            description: "Core strength and stability exercise".to_string(),
            instructions: "Maintain a straight line from head to heels".to_string(),
            tip: "Maintain a straight line from head to heels, engage your core".to_string(),
            required_keypoints: plank_joints,
            target_angles: ranges(&[
                (AngleName::Elbow, 80.0, 100.0),
                (AngleName::Back, 165.0, 195.0),
            ]),
            rep_transition: None,
            hold_state: Some(ExerciseState::Correct),
            points: 50,
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_builtin_definitions_are_valid() {
        let registry = ExerciseRegistry::builtin();
        assert_eq!(registry.len(), 4);

        for definition in registry.definitions() {
            assert!(definition.validate().is_ok(), "{:?}", definition.id);
        }
    }

    #[test]
    fn test_find_by_id() {
        let registry = ExerciseRegistry::builtin();

        let squat = registry.find("squat").unwrap();
        assert_eq!(squat.points, 150);
        assert_eq!(squat.range(AngleName::Knee), Some(AngleRange::new(70.0, 120.0)));

        let plank = registry.find("plank").unwrap();
        assert_eq!(plank.required_keypoints.len(), 10);
        assert_eq!(plank.rep_transition, None);

        assert!(matches!(
            registry.find("burpee"),
            Err(ComputeError::UnknownExercise(_))
        ));
    }

    #[test]
    fn test_lookups_share_one_definition() {
        let registry = ExerciseRegistry::builtin();
        let a = registry.get(ExerciseKind::Pushup).unwrap();
        let b = registry.get(ExerciseKind::Pushup).unwrap();
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn test_inverted_range_rejected() {
        let mut definition = ExerciseRegistry::builtin()
            .get(ExerciseKind::Pushup)
            .unwrap()
            .as_ref()
            .clone();
        definition
            .target_angles
            .insert(AngleName::Elbow, AngleRange::new(130.0, 60.0));

        assert!(matches!(
            definition.validate(),
            Err(ComputeError::InvalidDefinition(_))
        ));
    }

    #[test]
    fn test_missing_required_range_rejected() {
        let mut definition = ExerciseRegistry::builtin()
            .get(ExerciseKind::Lunges)
            .unwrap()
            .as_ref()
            .clone();
        definition.target_angles.remove(&AngleName::BackKnee);
        assert!(definition.validate().is_err());

        definition.target_angles.insert(AngleName::BackKnee, AngleRange::new(80.0, 110.0));
        definition.required_keypoints.clear();
        assert!(definition.validate().is_err());
    }

    #[test]
    fn test_registry_json_roundtrip() {
        let registry = ExerciseRegistry::builtin();
        let json = registry.to_json().unwrap();

        let restored = ExerciseRegistry::from_json(&json).unwrap();
        assert_eq!(restored.len(), 4);
        assert_eq!(
            restored.get(ExerciseKind::Lunges).unwrap().as_ref(),
            registry.get(ExerciseKind::Lunges).unwrap().as_ref()
        );
    }

    #[test]
    fn test_duplicate_definitions_rejected() {
        let pushup = ExerciseRegistry::builtin()
            .get(ExerciseKind::Pushup)
            .unwrap()
            .as_ref()
            .clone();

        assert!(ExerciseRegistry::new(vec![pushup.clone(), pushup]).is_err());
    }
}
