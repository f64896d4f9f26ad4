//! Composition and player position models matching the frontend interfaces.

use serde::{Deserialize, Serialize};

use crate::errors::FieldError;

/// A player placed at a normalized position on the field.
///
/// `x` runs 0.0 (left) to 1.0 (right); `y` runs 0.0 (bottom) to 1.0 (top).
/// Values outside [0, 1] are stored as-is and drawn off-pitch.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerPosition {
    pub id: i64,
    pub composition_id: i64,
    pub player_name: String,
    /// Free-text role label (e.g. "Left Winger"), not a coordinate.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub number: Option<i64>,
    /// Hex color used for rendering only; invalid values fall back at draw time.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    pub x: f64,
    pub y: f64,
}

/// A saved named lineup owned by one user.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Composition {
    pub id: i64,
    pub name: String,
    pub formation: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub is_favorite: bool,
    pub created_at: String,
    pub updated_at: String,
    #[serde(default)]
    pub players: Vec<PlayerPosition>,
}

/// A player entry as supplied by the client; ids are assigned by the store.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerDraft {
    pub player_name: String,
    #[serde(default)]
    pub position: Option<String>,
    #[serde(default)]
    pub number: Option<i64>,
    #[serde(default)]
    pub color: Option<String>,
    pub x: f64,
    pub y: f64,
}

/// Request body for creating a composition, and for updating one
/// (updates are a full overwrite of the same shape).
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompositionDraft {
    pub name: String,
    pub formation: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub is_favorite: bool,
    #[serde(default)]
    pub players: Vec<PlayerDraft>,
}

impl CompositionDraft {
    /// Validate the draft, producing field-level errors.
    ///
    /// Coordinates must be finite but are intentionally not range-checked.
    pub fn validate(&self) -> Result<(), Vec<FieldError>> {
        let mut errors = Vec::new();

        if self.name.trim().is_empty() {
            errors.push(FieldError::new("name", "is required"));
        }
        if self.formation.trim().is_empty() {
            errors.push(FieldError::new("formation", "is required"));
        }

        for (i, player) in self.players.iter().enumerate() {
            if player.player_name.trim().is_empty() {
                errors.push(FieldError::new(
                    &format!("players[{}].playerName", i),
                    "is required",
                ));
            }
            if !player.x.is_finite() {
                errors.push(FieldError::new(
                    &format!("players[{}].x", i),
                    "must be a finite number",
                ));
            }
            if !player.y.is_finite() {
                errors.push(FieldError::new(
                    &format!("players[{}].y", i),
                    "must be a finite number",
                ));
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}
