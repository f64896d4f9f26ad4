//! In-memory edit sessions for building a composition before committing.
//!
//! A session starts empty or seeded from a fetched composition, buffers any
//! number of player edits locally (no store round-trip per move), and
//! commits with full-replace semantics on an explicit save. A failed save
//! keeps the draft intact so no work is lost. `Saved` and `Discarded` are
//! terminal; a new session starts fresh.

use crate::db::Repository;
use crate::errors::AppError;
use crate::models::{Composition, CompositionDraft, PlayerDraft};

/// Lifecycle state of an edit session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Editing,
    Saved,
    Discarded,
}

/// A player entry in the draft. Ids are client-local and negative until the
/// store assigns real ones on save.
#[derive(Debug, Clone)]
pub struct DraftPlayer {
    pub id: i64,
    pub player_name: String,
    pub position: Option<String>,
    pub number: Option<i64>,
    pub color: Option<String>,
    pub x: f64,
    pub y: f64,
}

/// Mutable fields of a draft player, for [`EditSession::update_player`].
#[derive(Debug, Clone, Default)]
pub struct PlayerFields {
    pub player_name: Option<String>,
    pub position: Option<Option<String>>,
    pub number: Option<Option<i64>>,
    pub color: Option<Option<String>>,
}

/// An in-progress composition edit for one owner.
#[derive(Debug, Clone)]
pub struct EditSession {
    owner_id: i64,
    composition_id: Option<i64>,
    pub name: String,
    pub formation: String,
    pub description: Option<String>,
    pub is_favorite: bool,
    players: Vec<DraftPlayer>,
    selected: Option<i64>,
    state: SessionState,
    next_temp_id: i64,
}

impl EditSession {
    /// Start an empty draft for a new composition.
    pub fn new(owner_id: i64) -> Self {
        Self {
            owner_id,
            composition_id: None,
            name: String::new(),
            formation: String::new(),
            description: None,
            is_favorite: false,
            players: Vec::new(),
            selected: None,
            state: SessionState::Editing,
            next_temp_id: -1,
        }
    }

    /// Start a draft seeded from a fetched composition.
    pub fn from_composition(owner_id: i64, composition: &Composition) -> Self {
        Self {
            owner_id,
            composition_id: Some(composition.id),
            name: composition.name.clone(),
            formation: composition.formation.clone(),
            description: composition.description.clone(),
            is_favorite: composition.is_favorite,
            players: composition
                .players
                .iter()
                .map(|p| DraftPlayer {
                    id: p.id,
                    player_name: p.player_name.clone(),
                    position: p.position.clone(),
                    number: p.number,
                    color: p.color.clone(),
                    x: p.x,
                    y: p.y,
                })
                .collect(),
            selected: None,
            state: SessionState::Editing,
            next_temp_id: -1,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn players(&self) -> &[DraftPlayer] {
        &self.players
    }

    pub fn selected(&self) -> Option<i64> {
        self.selected
    }

    fn ensure_editing(&self) -> Result<(), AppError> {
        match self.state {
            SessionState::Editing => Ok(()),
            _ => Err(AppError::BadRequest("Edit session is closed".to_string())),
        }
    }

    /// Append a player under a client-local temporary id, which is returned.
    pub fn add_player(&mut self, player: PlayerDraft) -> Result<i64, AppError> {
        self.ensure_editing()?;
        let id = self.next_temp_id;
        self.next_temp_id -= 1;
        self.players.push(DraftPlayer {
            id,
            player_name: player.player_name,
            position: player.position,
            number: player.number,
            color: player.color,
            x: player.x,
            y: player.y,
        });
        Ok(id)
    }

    /// Replace the matching player's fields.
    pub fn update_player(&mut self, id: i64, fields: PlayerFields) -> Result<(), AppError> {
        self.ensure_editing()?;
        let player = self
            .players
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or_else(|| AppError::NotFound(format!("No draft player {}", id)))?;

        if let Some(name) = fields.player_name {
            player.player_name = name;
        }
        if let Some(position) = fields.position {
            player.position = position;
        }
        if let Some(number) = fields.number {
            player.number = number;
        }
        if let Some(color) = fields.color {
            player.color = color;
        }
        Ok(())
    }

    /// Update only the coordinates (drag-end).
    pub fn move_player(&mut self, id: i64, x: f64, y: f64) -> Result<(), AppError> {
        self.ensure_editing()?;
        let player = self
            .players
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or_else(|| AppError::NotFound(format!("No draft player {}", id)))?;
        player.x = x;
        player.y = y;
        Ok(())
    }

    /// Remove a player, clearing the selection if it pointed at them.
    pub fn delete_player(&mut self, id: i64) -> Result<(), AppError> {
        self.ensure_editing()?;
        let before = self.players.len();
        self.players.retain(|p| p.id != id);
        if self.players.len() == before {
            return Err(AppError::NotFound(format!("No draft player {}", id)));
        }
        if self.selected == Some(id) {
            self.selected = None;
        }
        Ok(())
    }

    pub fn select_player(&mut self, id: Option<i64>) {
        self.selected = id;
    }

    /// Commit the draft to the store with full-replace semantics.
    ///
    /// On failure the draft is untouched and stays editable; on success the
    /// session becomes `Saved` and the persisted entity (with real ids) is
    /// returned.
    pub async fn save(&mut self, repo: &Repository) -> Result<Composition, AppError> {
        self.ensure_editing()?;

        let draft = CompositionDraft {
            name: self.name.clone(),
            formation: self.formation.clone(),
            description: self.description.clone(),
            is_favorite: self.is_favorite,
            players: self
                .players
                .iter()
                .map(|p| PlayerDraft {
                    player_name: p.player_name.clone(),
                    position: p.position.clone(),
                    number: p.number,
                    color: p.color.clone(),
                    x: p.x,
                    y: p.y,
                })
                .collect(),
        };

        if let Err(errors) = draft.validate() {
            return Err(AppError::Validation(errors));
        }

        let saved = match self.composition_id {
            None => repo.create_composition(self.owner_id, &draft).await?,
            Some(id) => repo
                .update_composition(self.owner_id, id, &draft)
                .await?
                .ok_or_else(|| AppError::NotFound(format!("Composition {} not found", id)))?,
        };

        self.state = SessionState::Saved;
        Ok(saved)
    }

    /// Abandon the draft without saving.
    pub fn discard(&mut self) {
        self.state = SessionState::Discarded;
    }
}
