// Canvas painting. Every paint is scoped by save/restore so the rotation never
// leaks into the next frame.

use serde::{Deserialize, Serialize};

use crate::error::EngineError;
use crate::types::{CanvasSize, DrawInstruction};

/// 2D drawing surface. Implemented by the browser canvas and by `DrawList`.
pub trait Canvas {
    fn save(&mut self);
    fn restore(&mut self);
    fn clear(&mut self, size: CanvasSize);
    /// Blit the current camera frame over the whole canvas.
    fn draw_camera_frame(&mut self, size: CanvasSize) -> Result<(), EngineError>;
    fn translate(&mut self, x: f64, y: f64) -> Result<(), EngineError>;
    fn rotate(&mut self, angle: f64) -> Result<(), EngineError>;
    /// Blit the overlay sprite into the given rectangle.
    fn draw_overlay(&mut self, x: f64, y: f64, width: f64, height: f64) -> Result<(), EngineError>;
}

/// Translate to the anchor, rotate, blit the sprite centred, then restore.
/// The context is restored even when a drawing call fails.
pub fn paint_overlay<C: Canvas + ?Sized>(
    canvas: &mut C,
    draw: &DrawInstruction,
) -> Result<(), EngineError> {
    canvas.save();
    let result = blit_centred(canvas, draw);
    canvas.restore();
    result
}

fn blit_centred<C: Canvas + ?Sized>(
    canvas: &mut C,
    draw: &DrawInstruction,
) -> Result<(), EngineError> {
    canvas.translate(draw.anchor_x, draw.anchor_y)?;
    canvas.rotate(draw.rotation)?;
    canvas.draw_overlay(
        -draw.width / 2.0,
        -draw.height / 2.0,
        draw.width,
        draw.height,
    )
}

/// One recorded canvas call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op")]
pub enum DrawOp {
    Save,
    Restore,
    Clear { width: f64, height: f64 },
    CameraFrame { width: f64, height: f64 },
    Translate { x: f64, y: f64 },
    Rotate { angle: f64 },
    Overlay { x: f64, y: f64, width: f64, height: f64 },
}

/// Display list for hosts that paint on the JS side.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DrawList {
    pub ops: Vec<DrawOp>,
}

impl DrawList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn overlay_draws(&self) -> usize {
        self.ops
            .iter()
            .filter(|op| matches!(op, DrawOp::Overlay { .. }))
            .count()
    }
}

impl Canvas for DrawList {
    fn save(&mut self) {
        self.ops.push(DrawOp::Save);
    }

    fn restore(&mut self) {
        self.ops.push(DrawOp::Restore);
    }

    fn clear(&mut self, size: CanvasSize) {
        self.ops.push(DrawOp::Clear {
            width: size.width,
            height: size.height,
        });
    }

    fn draw_camera_frame(&mut self, size: CanvasSize) -> Result<(), EngineError> {
        self.ops.push(DrawOp::CameraFrame {
            width: size.width,
            height: size.height,
        });
        Ok(())
    }

    fn translate(&mut self, x: f64, y: f64) -> Result<(), EngineError> {
        self.ops.push(DrawOp::Translate { x, y });
        Ok(())
    }

    fn rotate(&mut self, angle: f64) -> Result<(), EngineError> {
        self.ops.push(DrawOp::Rotate { angle });
        Ok(())
    }

    fn draw_overlay(&mut self, x: f64, y: f64, width: f64, height: f64) -> Result<(), EngineError> {
        self.ops.push(DrawOp::Overlay {
            x,
            y,
            width,
            height,
        });
        Ok(())
    }
}
