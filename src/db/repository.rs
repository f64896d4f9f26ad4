//! Database repository for CRUD operations.
//!
//! Uses prepared statements and transactions for data integrity. All
//! composition operations are scoped to the owning user; not-found and
//! not-owned are indistinguishable to callers.

use chrono::Utc;
use sqlx::{Row, SqlitePool};

use crate::auth::can_access;
use crate::errors::AppError;
use crate::models::{Composition, CompositionDraft, PlayerPosition, RefreshToken, User};

/// Database repository for all data operations.
#[derive(Clone)]
pub struct Repository {
    pool: SqlitePool,
}

impl Repository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    // ==================== USER OPERATIONS ====================

    /// Create a new user. Fails if the email is already registered.
    pub async fn create_user(
        &self,
        email: &str,
        username: &str,
        password_hash: &str,
    ) -> Result<User, AppError> {
        let now = Utc::now().to_rfc3339();

        let result = sqlx::query(
            "INSERT INTO users (email, username, password_hash, role, created_at) VALUES (?, ?, ?, 'user', ?)",
        )
        .bind(email)
        .bind(username)
        .bind(password_hash)
        .bind(&now)
        .execute(&self.pool)
        .await?;

        Ok(User {
            id: result.last_insert_rowid(),
            email: email.to_string(),
            username: username.to_string(),
            password_hash: password_hash.to_string(),
            role: "user".to_string(),
            created_at: now,
        })
    }

    /// Look up a user by email (used by login and duplicate checks).
    pub async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        let row = sqlx::query(
            "SELECT id, email, username, password_hash, role, created_at FROM users WHERE email = ?",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(user_from_row))
    }

    /// Get a user by id.
    pub async fn get_user(&self, id: i64) -> Result<Option<User>, AppError> {
        let row = sqlx::query(
            "SELECT id, email, username, password_hash, role, created_at FROM users WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(user_from_row))
    }

    /// Update the caller's profile fields, returning the fresh user.
    pub async fn update_user_profile(
        &self,
        id: i64,
        username: Option<&str>,
        email: Option<&str>,
    ) -> Result<Option<User>, AppError> {
        let Some(existing) = self.get_user(id).await? else {
            return Ok(None);
        };

        let username = username.unwrap_or(&existing.username);
        let email = email.unwrap_or(&existing.email);

        sqlx::query("UPDATE users SET username = ?, email = ? WHERE id = ?")
            .bind(username)
            .bind(email)
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(Some(User {
            username: username.to_string(),
            email: email.to_string(),
            ..existing
        }))
    }

    // ==================== REFRESH TOKEN OPERATIONS ====================

    /// Store a new refresh token for a user.
    pub async fn insert_refresh_token(
        &self,
        user_id: i64,
        token: &str,
        expires_at: &str,
    ) -> Result<(), AppError> {
        sqlx::query(
            "INSERT INTO refresh_tokens (token, user_id, expires_at, revoked) VALUES (?, ?, ?, 0)",
        )
        .bind(token)
        .bind(user_id)
        .bind(expires_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Look up a refresh token by its opaque value.
    pub async fn find_refresh_token(&self, token: &str) -> Result<Option<RefreshToken>, AppError> {
        let row = sqlx::query(
            "SELECT id, token, user_id, expires_at, revoked FROM refresh_tokens WHERE token = ?",
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|row| {
            let revoked: i64 = row.get("revoked");
            RefreshToken {
                id: row.get("id"),
                token: row.get("token"),
                user_id: row.get("user_id"),
                expires_at: row.get("expires_at"),
                revoked: revoked != 0,
            }
        }))
    }

    /// Revoke a refresh token (rotation marks the old one unusable).
    pub async fn revoke_refresh_token(&self, id: i64) -> Result<(), AppError> {
        sqlx::query("UPDATE refresh_tokens SET revoked = 1 WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    // ==================== COMPOSITION OPERATIONS ====================

    /// List all compositions owned by a user, players eagerly loaded.
    pub async fn list_compositions(&self, owner_id: i64) -> Result<Vec<Composition>, AppError> {
        let rows = sqlx::query(
            "SELECT id, user_id, name, formation, description, is_favorite, created_at, updated_at
               FROM compositions WHERE user_id = ? ORDER BY updated_at DESC",
        )
        .bind(owner_id)
        .fetch_all(&self.pool)
        .await?;

        let mut compositions = Vec::with_capacity(rows.len());
        for row in &rows {
            let mut composition = composition_from_row(row);
            composition.players = self.load_players(composition.id).await?;
            compositions.push(composition);
        }

        Ok(compositions)
    }

    /// Get a composition by id, only if the caller owns it.
    pub async fn get_composition(
        &self,
        owner_id: i64,
        id: i64,
    ) -> Result<Option<Composition>, AppError> {
        let row = sqlx::query(
            "SELECT id, user_id, name, formation, description, is_favorite, created_at, updated_at
               FROM compositions WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let row_owner: i64 = row.get("user_id");
        if !can_access(owner_id, row_owner) {
            // Indistinguishable from absence to avoid existence leakage
            return Ok(None);
        }

        let mut composition = composition_from_row(&row);
        composition.players = self.load_players(composition.id).await?;
        Ok(Some(composition))
    }

    /// Create a composition with its player list in one transaction.
    ///
    /// The owner always comes from the authenticated caller, never from the
    /// request body.
    pub async fn create_composition(
        &self,
        owner_id: i64,
        draft: &CompositionDraft,
    ) -> Result<Composition, AppError> {
        let now = Utc::now().to_rfc3339();

        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            "INSERT INTO compositions (user_id, name, formation, description, is_favorite, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(owner_id)
        .bind(&draft.name)
        .bind(&draft.formation)
        .bind(&draft.description)
        .bind(draft.is_favorite as i32)
        .bind(&now)
        .bind(&now)
        .execute(&mut *tx)
        .await?;

        let composition_id = result.last_insert_rowid();

        let mut players = Vec::with_capacity(draft.players.len());
        for player in &draft.players {
            let result = sqlx::query(
                "INSERT INTO player_positions (composition_id, player_name, position, number, color, x, y)
                 VALUES (?, ?, ?, ?, ?, ?, ?)",
            )
            .bind(composition_id)
            .bind(&player.player_name)
            .bind(&player.position)
            .bind(player.number)
            .bind(&player.color)
            .bind(player.x)
            .bind(player.y)
            .execute(&mut *tx)
            .await?;

            players.push(PlayerPosition {
                id: result.last_insert_rowid(),
                composition_id,
                player_name: player.player_name.clone(),
                position: player.position.clone(),
                number: player.number,
                color: player.color.clone(),
                x: player.x,
                y: player.y,
            });
        }

        tx.commit().await?;

        Ok(Composition {
            id: composition_id,
            name: draft.name.clone(),
            formation: draft.formation.clone(),
            description: draft.description.clone(),
            is_favorite: draft.is_favorite,
            created_at: now.clone(),
            updated_at: now,
            players,
        })
    }

    /// Replace a composition wholesale: name fields are overwritten and the
    /// entire player collection is discarded and re-created, atomically.
    pub async fn update_composition(
        &self,
        owner_id: i64,
        id: i64,
        draft: &CompositionDraft,
    ) -> Result<Option<Composition>, AppError> {
        let now = Utc::now().to_rfc3339();

        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            "UPDATE compositions SET name = ?, formation = ?, description = ?, is_favorite = ?, updated_at = ?
             WHERE id = ? AND user_id = ?",
        )
        .bind(&draft.name)
        .bind(&draft.formation)
        .bind(&draft.description)
        .bind(draft.is_favorite as i32)
        .bind(&now)
        .bind(id)
        .bind(owner_id)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }

        sqlx::query("DELETE FROM player_positions WHERE composition_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        let mut players = Vec::with_capacity(draft.players.len());
        for player in &draft.players {
            let result = sqlx::query(
                "INSERT INTO player_positions (composition_id, player_name, position, number, color, x, y)
                 VALUES (?, ?, ?, ?, ?, ?, ?)",
            )
            .bind(id)
            .bind(&player.player_name)
            .bind(&player.position)
            .bind(player.number)
            .bind(&player.color)
            .bind(player.x)
            .bind(player.y)
            .execute(&mut *tx)
            .await?;

            players.push(PlayerPosition {
                id: result.last_insert_rowid(),
                composition_id: id,
                player_name: player.player_name.clone(),
                position: player.position.clone(),
                number: player.number,
                color: player.color.clone(),
                x: player.x,
                y: player.y,
            });
        }

        let row = sqlx::query("SELECT created_at FROM compositions WHERE id = ?")
            .bind(id)
            .fetch_one(&mut *tx)
            .await?;
        let created_at: String = row.get("created_at");

        tx.commit().await?;

        Ok(Some(Composition {
            id,
            name: draft.name.clone(),
            formation: draft.formation.clone(),
            description: draft.description.clone(),
            is_favorite: draft.is_favorite,
            created_at,
            updated_at: now,
            players,
        }))
    }

    /// Delete a composition and its players in one transaction.
    ///
    /// Returns false when no owned row matched.
    pub async fn delete_composition(&self, owner_id: i64, id: i64) -> Result<bool, AppError> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query("SELECT id FROM compositions WHERE id = ? AND user_id = ?")
            .bind(id)
            .bind(owner_id)
            .fetch_optional(&mut *tx)
            .await?;

        if row.is_none() {
            return Ok(false);
        }

        // Child rows first, then the parent
        sqlx::query("DELETE FROM player_positions WHERE composition_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        sqlx::query("DELETE FROM compositions WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(true)
    }

    async fn load_players(&self, composition_id: i64) -> Result<Vec<PlayerPosition>, AppError> {
        let rows = sqlx::query(
            "SELECT id, composition_id, player_name, position, number, color, x, y
               FROM player_positions WHERE composition_id = ? ORDER BY id",
        )
        .bind(composition_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(player_from_row).collect())
    }
}

// Helper functions for row conversion

fn user_from_row(row: &sqlx::sqlite::SqliteRow) -> User {
    User {
        id: row.get("id"),
        email: row.get("email"),
        username: row.get("username"),
        password_hash: row.get("password_hash"),
        role: row.get("role"),
        created_at: row.get("created_at"),
    }
}

fn composition_from_row(row: &sqlx::sqlite::SqliteRow) -> Composition {
    let is_favorite: i64 = row.get("is_favorite");
    Composition {
        id: row.get("id"),
        name: row.get("name"),
        formation: row.get("formation"),
        description: row.get("description"),
        is_favorite: is_favorite != 0,
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
        players: Vec::new(),
    }
}

fn player_from_row(row: &sqlx::sqlite::SqliteRow) -> PlayerPosition {
    PlayerPosition {
        id: row.get("id"),
        composition_id: row.get("composition_id"),
        player_name: row.get("player_name"),
        position: row.get("position"),
        number: row.get("number"),
        color: row.get("color"),
        x: row.get("x"),
        y: row.get("y"),
    }
}
