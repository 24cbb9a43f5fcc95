// Landmark source adapter: one decode step for every pose estimator output shape,
// normalized to the four torso landmarks the overlay needs.
// MediaPipe: indexed array with `visibility`. TF.js: named keypoints with `score`.

use serde::Deserialize;

use crate::error::EngineError;
use crate::types::{CanvasSize, Point};

/// Torso points used for garment placement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BodyPart {
    LeftShoulder,
    RightShoulder,
    LeftHip,
    RightHip,
}

impl BodyPart {
    pub const TORSO: [BodyPart; 4] = [
        BodyPart::LeftShoulder,
        BodyPart::RightShoulder,
        BodyPart::LeftHip,
        BodyPart::RightHip,
    ];

    /// Index in the 33-point BlazePose landmark array.
    pub fn blazepose_index(&self) -> usize {
        match self {
            BodyPart::LeftShoulder => 11,
            BodyPart::RightShoulder => 12,
            BodyPart::LeftHip => 23,
            BodyPart::RightHip => 24,
        }
    }

    /// Both keypoint spellings seen in the wild.
    pub fn keypoint_names(&self) -> [&'static str; 2] {
        match self {
            BodyPart::LeftShoulder => ["left_shoulder", "leftShoulder"],
            BodyPart::RightShoulder => ["right_shoulder", "rightShoulder"],
            BodyPart::LeftHip => ["left_hip", "leftHip"],
            BodyPart::RightHip => ["right_hip", "rightHip"],
        }
    }

    pub fn matches_name(&self, name: &str) -> bool {
        self.keypoint_names().contains(&name)
    }
}

/// One detected point, normalized to 0-1 image space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Landmark {
    pub part: BodyPart,
    pub position: Point,
    /// Visibility or score, clamped to [0, 1].
    pub confidence: f64,
}

impl Landmark {
    fn new(part: BodyPart, x: f64, y: f64, confidence: Option<f64>) -> Option<Self> {
        if !x.is_finite() || !y.is_finite() {
            return None;
        }
        // Sources that omit confidence report only points they are sure of.
        let confidence = confidence.unwrap_or(1.0);
        let confidence = if confidence.is_finite() {
            confidence.clamp(0.0, 1.0)
        } else {
            0.0
        };
        Some(Landmark {
            part,
            position: Point::new(x, y),
            confidence,
        })
    }
}

/// The four landmarks a torso frame is built from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TorsoLandmarks {
    pub left_shoulder: Landmark,
    pub right_shoulder: Landmark,
    pub left_hip: Landmark,
    pub right_hip: Landmark,
}

impl TorsoLandmarks {
    pub fn iter(&self) -> impl Iterator<Item = &Landmark> {
        [
            &self.left_shoulder,
            &self.right_shoulder,
            &self.left_hip,
            &self.right_hip,
        ]
        .into_iter()
    }

    pub fn min_confidence(&self) -> f64 {
        self.iter().map(|l| l.confidence).fold(1.0, f64::min)
    }

    fn assemble(
        mut find: impl FnMut(BodyPart) -> Option<Landmark>,
    ) -> Result<TorsoLandmarks, EngineError> {
        let mut get = |part| find(part).ok_or(EngineError::LandmarksUnavailable);
        Ok(TorsoLandmarks {
            left_shoulder: get(BodyPart::LeftShoulder)?,
            right_shoulder: get(BodyPart::RightShoulder)?,
            left_hip: get(BodyPart::LeftHip)?,
            right_hip: get(BodyPart::RightHip)?,
        })
    }
}

/// MediaPipe landmark (normalized coordinates).
#[derive(Debug, Clone, Deserialize)]
pub struct IndexedLandmark {
    pub x: f64,
    pub y: f64,
    #[serde(default)]
    pub z: Option<f64>,
    #[serde(default)]
    pub visibility: Option<f64>,
}

/// TF.js keypoint, in pixels of the estimator input frame.
#[derive(Debug, Clone, Deserialize)]
pub struct NamedKeypoint {
    #[serde(alias = "part")]
    pub name: String,
    pub x: f64,
    pub y: f64,
    #[serde(default)]
    pub score: Option<f64>,
}

/// One detection of named keypoints.
#[derive(Debug, Clone, Deserialize)]
pub struct KeypointSet {
    pub keypoints: Vec<NamedKeypoint>,
    #[serde(default)]
    pub image_width: Option<f64>,
    #[serde(default)]
    pub image_height: Option<f64>,
}

impl KeypointSet {
    fn torso(&self, frame: CanvasSize) -> Result<TorsoLandmarks, EngineError> {
        let extent = CanvasSize::new(
            self.image_width.unwrap_or(frame.width),
            self.image_height.unwrap_or(frame.height),
        );
        named_torso(&self.keypoints, extent)
    }
}

/// Pose estimator output, decoded once per frame.
/// Variant order matters: serde tries them top to bottom.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum PoseOutput {
    /// `{ "keypoints": [...], "image_width"?, "image_height"? }`
    Keypoints(KeypointSet),
    /// `[ { "name": "left_shoulder", "x", "y", "score" }, ... ]`
    NamedList(Vec<NamedKeypoint>),
    /// `[ { "x", "y", "z", "visibility" }, ... ]` in BlazePose order.
    IndexedList(Vec<IndexedLandmark>),
    /// `[ { "keypoints": [...] }, ... ]`; the first detection is used.
    Detections(Vec<KeypointSet>),
    /// MediaPipe results object. No person: `poseLandmarks` missing or null.
    Landmarks {
        #[serde(rename = "poseLandmarks", alias = "landmarks", default)]
        pose_landmarks: Option<Vec<IndexedLandmark>>,
    },
    /// `null`
    Empty,
}

impl PoseOutput {
    pub fn from_json(json: &str) -> Result<PoseOutput, EngineError> {
        Ok(serde_json::from_str(json)?)
    }

    /// The four torso landmarks in 0-1 space, or `LandmarksUnavailable` for
    /// this frame. `frame` is the estimator input size, used to normalize
    /// pixel keypoints that do not carry their own image size.
    pub fn torso(&self, frame: CanvasSize) -> Result<TorsoLandmarks, EngineError> {
        match self {
            PoseOutput::Keypoints(set) => set.torso(frame),
            PoseOutput::NamedList(keypoints) => named_torso(keypoints, frame),
            PoseOutput::IndexedList(landmarks) => indexed_torso(landmarks),
            PoseOutput::Detections(sets) => sets
                .first()
                .ok_or(EngineError::LandmarksUnavailable)?
                .torso(frame),
            PoseOutput::Landmarks { pose_landmarks } => indexed_torso(
                pose_landmarks
                    .as_deref()
                    .ok_or(EngineError::LandmarksUnavailable)?,
            ),
            PoseOutput::Empty => Err(EngineError::LandmarksUnavailable),
        }
    }
}

fn indexed_torso(landmarks: &[IndexedLandmark]) -> Result<TorsoLandmarks, EngineError> {
    TorsoLandmarks::assemble(|part| {
        let lm = landmarks.get(part.blazepose_index())?;
        Landmark::new(part, lm.x, lm.y, lm.visibility)
    })
}

fn named_torso(keypoints: &[NamedKeypoint], extent: CanvasSize) -> Result<TorsoLandmarks, EngineError> {
    // A zero-sized frame (video not started) cannot normalize anything.
    if !(extent.width > 0.0 && extent.height > 0.0) {
        return Err(EngineError::LandmarksUnavailable);
    }
    TorsoLandmarks::assemble(|part| {
        let kp = keypoints.iter().find(|kp| part.matches_name(&kp.name))?;
        Landmark::new(part, kp.x / extent.width, kp.y / extent.height, kp.score)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::{json, Value};

    /// Power-of-two extent, so scaling to pixels and back is exact.
    fn frame() -> CanvasSize {
        CanvasSize::new(512.0, 256.0)
    }

    /// BlazePose-style array with the torso points set and everything else at the origin.
    fn blazepose(points: &[(BodyPart, f64, f64, f64)]) -> Value {
        let mut landmarks = vec![json!({"x": 0.0, "y": 0.0, "z": 0.0, "visibility": 0.1}); 33];
        for (part, x, y, v) in points {
            landmarks[part.blazepose_index()] = json!({"x": x, "y": y, "z": -0.2, "visibility": v});
        }
        Value::Array(landmarks)
    }

    /// TF.js-style keypoints, scaled from 0-1 to pixels of `extent`.
    fn named(points: &[(BodyPart, f64, f64, f64)], camel: bool, extent: CanvasSize) -> Value {
        let mut keypoints = vec![json!({"name": "nose", "x": 0.5 * extent.width, "y": 0.1 * extent.height, "score": 0.9})];
        for (part, x, y, s) in points {
            let name = part.keypoint_names()[camel as usize];
            keypoints.push(json!({
                "name": name,
                "x": x * extent.width,
                "y": y * extent.height,
                "score": s
            }));
        }
        Value::Array(keypoints)
    }

    fn upright() -> Vec<(BodyPart, f64, f64, f64)> {
        vec![
            (BodyPart::LeftShoulder, 0.4, 0.3, 0.95),
            (BodyPart::RightShoulder, 0.6, 0.3, 0.9),
            (BodyPart::LeftHip, 0.42, 0.6, 0.85),
            (BodyPart::RightHip, 0.58, 0.6, 0.8),
        ]
    }

    fn decode(value: Value) -> PoseOutput {
        PoseOutput::from_json(&value.to_string()).expect("decodes")
    }

    #[test]
    fn mediapipe_results_object() {
        let output = decode(json!({"poseLandmarks": blazepose(&upright()), "image": {}}));
        assert!(matches!(output, PoseOutput::Landmarks { .. }));

        let torso = output.torso(frame()).unwrap();
        assert_eq!(torso.left_shoulder.position, Point::new(0.4, 0.3));
        assert_eq!(torso.right_hip.confidence, 0.8);
    }

    #[test]
    fn mediapipe_without_person() {
        let output = decode(json!({"poseLandmarks": null}));
        assert_eq!(output.torso(frame()), Err(EngineError::LandmarksUnavailable));

        let output = decode(json!({"image": {}}));
        assert_eq!(output.torso(frame()), Err(EngineError::LandmarksUnavailable));

        assert_eq!(
            decode(Value::Null).torso(frame()),
            Err(EngineError::LandmarksUnavailable)
        );
    }

    #[test]
    fn truncated_landmark_array_is_unavailable() {
        let short: Vec<Value> = (0..20).map(|_| json!({"x": 0.5, "y": 0.5})).collect();
        let output = decode(Value::Array(short));
        assert!(matches!(output, PoseOutput::IndexedList(_)));
        assert_eq!(output.torso(frame()), Err(EngineError::LandmarksUnavailable));
    }

    #[test]
    fn named_keypoints_both_spellings() {
        let snake = decode(named(&upright(), false, frame())).torso(frame()).unwrap();
        let camel = decode(named(&upright(), true, frame())).torso(frame()).unwrap();
        assert_eq!(snake, camel);
        assert!((snake.left_hip.position.x - 0.42).abs() < 1e-12);
        assert!((snake.left_hip.position.y - 0.6).abs() < 1e-12);
    }

    #[test]
    fn explicit_image_size_wins_over_frame() {
        let vga = CanvasSize::new(640.0, 480.0);
        let output = decode(json!({
            "keypoints": named(&upright(), false, vga),
            "image_width": 640,
            "image_height": 480
        }));
        let torso = output.torso(frame()).unwrap();
        assert!((torso.right_shoulder.position.x - 0.6).abs() < 1e-9);
        assert!((torso.left_hip.position.y - 0.6).abs() < 1e-9);
    }

    #[test]
    fn pixel_detections_use_frame_size() {
        let vga = CanvasSize::new(640.0, 480.0);
        let output = decode(json!([
            {"keypoints": named(&upright(), true, vga), "score": 0.8},
            {"keypoints": [], "score": 0.2}
        ]));
        assert!(matches!(output, PoseOutput::Detections(_)));

        let torso = output.torso(vga).unwrap();
        for (landmark, (_, x, y, _)) in torso.iter().zip(upright()) {
            assert!((landmark.position.x - x).abs() < 1e-9);
            assert!((landmark.position.y - y).abs() < 1e-9);
        }
    }

    #[test]
    fn empty_frame_cannot_normalize() {
        let output = decode(named(&upright(), false, frame()));
        assert_eq!(
            output.torso(CanvasSize::new(0.0, 0.0)),
            Err(EngineError::LandmarksUnavailable)
        );
    }

    #[test]
    fn missing_hip_is_unavailable() {
        let mut points = upright();
        points.pop();
        let output = decode(named(&points, false, frame()));
        assert_eq!(output.torso(frame()), Err(EngineError::LandmarksUnavailable));
    }

    #[test]
    fn confidence_is_clamped_and_defaulted() {
        let output = decode(json!([
            {"part": "leftShoulder", "x": 200, "y": 80, "score": 1.7},
            {"part": "rightShoulder", "x": 300, "y": 80},
            {"part": "leftHip", "x": 200, "y": 150, "score": -0.5},
            {"part": "rightHip", "x": 300, "y": 150, "score": 0.75}
        ]));
        let torso = output.torso(frame()).unwrap();
        assert_eq!(torso.left_shoulder.confidence, 1.0);
        assert_eq!(torso.right_shoulder.confidence, 1.0);
        assert_eq!(torso.left_hip.confidence, 0.0);
        assert_eq!(torso.min_confidence(), 0.0);
    }

    proptest! {
        /// Both estimator shapes carrying the same anatomy normalize identically.
        #[test]
        fn shapes_normalize_identically(
            coords in prop::collection::vec((0.0f64..1.0, 0.0f64..1.0, 0.0f64..1.0), 4),
            camel in any::<bool>(),
        ) {
            let points: Vec<_> = BodyPart::TORSO
                .iter()
                .zip(coords)
                .map(|(part, (x, y, c))| (*part, x, y, c))
                .collect();

            let indexed = decode(json!({"poseLandmarks": blazepose(&points)})).torso(frame()).unwrap();
            let keyed = decode(named(&points, camel, frame())).torso(frame()).unwrap();
            for (a, b) in indexed.iter().zip(keyed.iter()) {
                prop_assert_eq!(a.part, b.part);
                prop_assert_eq!(a.confidence, b.confidence);
                prop_assert!((a.position.x - b.position.x).abs() < 1e-12);
                prop_assert!((a.position.y - b.position.y).abs() < 1e-12);
            }
        }
    }
}
