// Torso-to-sprite placement.
// Rule: drop the frame when any torso point is unsure. No stale positions, no interpolation.

use std::f64::consts::PI;

use crate::landmarks::TorsoLandmarks;
use crate::types::*;

/// Placement geometry derived from the four torso landmarks (normalized space).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TorsoFrame {
    pub shoulder_center: Point,
    pub hip_center: Point,
    /// Horizontal shoulder span.
    pub torso_width: f64,
    /// Vertical left-shoulder to left-hip distance.
    pub torso_height: f64,
    /// Radians. The +π turns the mirrored shoulder line the garment's way up.
    pub rotation: f64,
}

impl TorsoFrame {
    /// `None` unless all four landmarks reach `min_confidence`.
    pub fn from_landmarks(landmarks: &TorsoLandmarks, min_confidence: f64) -> Option<Self> {
        if landmarks.iter().any(|l| l.confidence < min_confidence) {
            return None;
        }

        let ls = landmarks.left_shoulder.position;
        let rs = landmarks.right_shoulder.position;
        let lh = landmarks.left_hip.position;
        let rh = landmarks.right_hip.position;

        Some(TorsoFrame {
            shoulder_center: ls.midpoint(&rs),
            hip_center: lh.midpoint(&rh),
            torso_width: (ls.x - rs.x).abs(),
            torso_height: (ls.y - lh.y).abs(),
            rotation: (rs.y - ls.y).atan2(rs.x - ls.x) + PI,
        })
    }
}

/// Maps torso landmarks and the selected sprite to a draw instruction.
#[derive(Debug, Clone)]
pub struct OverlayTransform {
    settings: OverlaySettings,
}

impl OverlayTransform {
    pub fn new(settings: OverlaySettings) -> Self {
        OverlayTransform { settings }
    }

    pub fn settings(&self) -> &OverlaySettings {
        &self.settings
    }

    /// Placement in destination pixels, or `None` to skip this frame.
    pub fn compute(
        &self,
        landmarks: &TorsoLandmarks,
        item: &OverlayItem,
        canvas: CanvasSize,
    ) -> Option<DrawInstruction> {
        let frame = TorsoFrame::from_landmarks(landmarks, self.settings.min_confidence)?;
        Some(self.place(&frame, item, canvas))
    }

    pub fn place(&self, frame: &TorsoFrame, item: &OverlayItem, canvas: CanvasSize) -> DrawInstruction {
        let width = frame.torso_width * canvas.width * self.settings.width_padding;
        let torso_height = frame.torso_height * canvas.height * self.settings.height_padding;

        let height = match self.settings.sizing {
            OverlaySizing::TorsoHeight => torso_height,
            OverlaySizing::AspectRatio => item
                .aspect_ratio()
                .map(|ratio| width * ratio)
                .unwrap_or(torso_height),
        };

        // Halfway between shoulders and hips centres a torso garment.
        let anchor_y = (frame.shoulder_center.y + frame.hip_center.y) / 2.0;

        DrawInstruction {
            anchor_x: frame.shoulder_center.x * canvas.width,
            anchor_y: anchor_y * canvas.height,
            width,
            height,
            rotation: frame.rotation,
        }
    }
}

impl Default for OverlayTransform {
    fn default() -> Self {
        Self::new(OverlaySettings::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::landmarks::{BodyPart, Landmark};
    use proptest::prelude::*;

    const EPS: f64 = 1e-9;

    fn landmark(part: BodyPart, x: f64, y: f64, confidence: f64) -> Landmark {
        Landmark {
            part,
            position: Point::new(x, y),
            confidence,
        }
    }

    fn torso(confidences: [f64; 4]) -> TorsoLandmarks {
        TorsoLandmarks {
            left_shoulder: landmark(BodyPart::LeftShoulder, 0.4, 0.3, confidences[0]),
            right_shoulder: landmark(BodyPart::RightShoulder, 0.6, 0.3, confidences[1]),
            left_hip: landmark(BodyPart::LeftHip, 0.42, 0.6, confidences[2]),
            right_hip: landmark(BodyPart::RightHip, 0.58, 0.6, confidences[3]),
        }
    }

    fn vga() -> CanvasSize {
        CanvasSize::new(640.0, 480.0)
    }

    #[test]
    fn upright_torso_placement() {
        let transform = OverlayTransform::default();
        let draw = transform
            .compute(&torso([0.9; 4]), &OverlayItem::new("shirt.png"), vga())
            .expect("all landmarks confident");

        assert!((draw.anchor_x - 320.0).abs() < EPS);
        assert!((draw.anchor_y - 0.45 * 480.0).abs() < EPS);
        assert!((draw.width - 230.4).abs() < EPS);
        assert!((draw.height - 158.4).abs() < EPS);
        assert!((draw.rotation - PI).abs() < EPS);
    }

    #[test]
    fn tilted_shoulders_rotate_sprite() {
        let mut lm = torso([0.9; 4]);
        lm.right_shoulder.position = Point::new(0.6, 0.4);
        let frame = TorsoFrame::from_landmarks(&lm, 0.7).unwrap();
        let expected = (0.1f64).atan2(0.2) + PI;
        assert!((frame.rotation - expected).abs() < EPS);
    }

    #[test]
    fn threshold_is_inclusive() {
        let transform = OverlayTransform::default();
        let item = OverlayItem::new("shirt.png");
        assert!(transform.compute(&torso([0.7; 4]), &item, vga()).is_some());
        assert!(transform
            .compute(&torso([0.9, 0.9, 0.69, 0.9]), &item, vga())
            .is_none());
    }

    #[test]
    fn aspect_ratio_sizing() {
        let transform = OverlayTransform::new(OverlaySettings {
            sizing: OverlaySizing::AspectRatio,
            ..Default::default()
        });
        let mut item = OverlayItem::new("shirt.png");

        // Unknown bitmap size falls back to the torso height.
        let draw = transform.compute(&torso([0.9; 4]), &item, vga()).unwrap();
        assert!((draw.height - 158.4).abs() < EPS);

        item.natural_width = Some(400.0);
        item.natural_height = Some(500.0);
        let draw = transform.compute(&torso([0.9; 4]), &item, vga()).unwrap();
        assert!((draw.height - 230.4 * 1.25).abs() < EPS);
    }

    proptest! {
        /// Any torso point under the threshold drops the frame.
        #[test]
        fn low_confidence_skips(
            weak in 0usize..4,
            low in 0.0f64..0.7,
            others in prop::array::uniform4(0.7f64..=1.0),
        ) {
            let mut confidences = others;
            confidences[weak] = low;
            let draw = OverlayTransform::default().compute(
                &torso(confidences),
                &OverlayItem::new("shirt.png"),
                vga(),
            );
            prop_assert!(draw.is_none());
        }
    }
}
