//! Board repository implementation

use std::collections::BTreeSet;

use crate::error::{Error, Result};
use crate::hash::ContentHash;
use crate::models::{Board, BoardId, CanvasImageRef, CanvasSize, Placement};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension};

const BOARD_COLUMNS: &str = "id, title, caption, tags, background_color, canvas_width, \
     canvas_height, has_margin, is_pinned, created_at, updated_at, sync_version";

/// Trait for board storage operations
pub trait BoardRepository {
    /// List all boards, most recently updated first
    fn list(&self) -> Result<Vec<Board>>;

    /// Get a board by ID
    fn get(&self, id: &BoardId) -> Result<Option<Board>>;

    /// Insert or fully replace a board and its image placements
    fn upsert(&self, board: &Board) -> Result<()>;

    /// Delete a board and its image placements
    fn delete(&self, id: &BoardId) -> Result<()>;
}

/// `SQLite` implementation of `BoardRepository`
pub struct SqliteBoardRepository<'a> {
    conn: &'a Connection,
}

impl<'a> SqliteBoardRepository<'a> {
    /// Create a new repository with the given connection
    pub const fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Load image placements for a board in paint order
    fn load_images(&self, board_id: &BoardId) -> Result<Vec<CanvasImageRef>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, hash, x, y, width, height, rotation, z_index, is_pinned,
                    natural_width, natural_height, mime_type, data
             FROM board_images
             WHERE board_id = ?
             ORDER BY position ASC",
        )?;

        let images = stmt
            .query_map(params![board_id.as_str()], |row| {
                Ok(CanvasImageRef {
                    id: row.get(0)?,
                    hash: ContentHash::new(row.get::<_, String>(1)?),
                    placement: Placement {
                        x: row.get(2)?,
                        y: row.get(3)?,
                        width: row.get(4)?,
                        height: row.get(5)?,
                        rotation: row.get(6)?,
                        z_index: row.get(7)?,
                    },
                    is_pinned: row.get(8)?,
                    natural_width: row.get(9)?,
                    natural_height: row.get(10)?,
                    mime_type: row.get(11)?,
                    data: row.get(12)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(images)
    }

    /// Parse a board (without images) from a database row
    fn parse_board(row: &rusqlite::Row<'_>) -> rusqlite::Result<Board> {
        let id: String = row.get(0)?;
        let id = id
            .parse::<BoardId>()
            .map_err(|error| rusqlite::Error::FromSqlConversionFailure(0, Type::Text, Box::new(error)))?;
        let tags: String = row.get(3)?;
        let tags: BTreeSet<String> = serde_json::from_str(&tags)
            .map_err(|error| rusqlite::Error::FromSqlConversionFailure(3, Type::Text, Box::new(error)))?;

        Ok(Board {
            id,
            title: row.get(1)?,
            caption: row.get(2)?,
            tags,
            background_color: row.get(4)?,
            canvas: CanvasSize {
                width: row.get(5)?,
                height: row.get(6)?,
            },
            has_margin: row.get(7)?,
            is_pinned: row.get(8)?,
            images: Vec::new(),
            created_at: row.get(9)?,
            updated_at: row.get(10)?,
            sync_version: row.get(11)?,
        })
    }
}

impl BoardRepository for SqliteBoardRepository<'_> {
    fn list(&self) -> Result<Vec<Board>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {BOARD_COLUMNS} FROM boards ORDER BY updated_at DESC"
        ))?;

        let mut boards = stmt
            .query_map([], Self::parse_board)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        for board in &mut boards {
            board.images = self.load_images(&board.id)?;
        }

        Ok(boards)
    }

    fn get(&self, id: &BoardId) -> Result<Option<Board>> {
        let board = self
            .conn
            .query_row(
                &format!("SELECT {BOARD_COLUMNS} FROM boards WHERE id = ?"),
                params![id.as_str()],
                Self::parse_board,
            )
            .optional()?;

        match board {
            Some(mut board) => {
                board.images = self.load_images(id)?;
                Ok(Some(board))
            }
            None => Ok(None),
        }
    }

    fn upsert(&self, board: &Board) -> Result<()> {
        let tags = serde_json::to_string(&board.tags)?;
        let tx = self.conn.unchecked_transaction()?;

        tx.execute(
            "INSERT INTO boards (id, title, caption, tags, background_color, canvas_width,
                                 canvas_height, has_margin, is_pinned, created_at, updated_at,
                                 sync_version)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET
                title = excluded.title,
                caption = excluded.caption,
                tags = excluded.tags,
                background_color = excluded.background_color,
                canvas_width = excluded.canvas_width,
                canvas_height = excluded.canvas_height,
                has_margin = excluded.has_margin,
                is_pinned = excluded.is_pinned,
                created_at = excluded.created_at,
                updated_at = excluded.updated_at,
                sync_version = excluded.sync_version",
            params![
                board.id.as_str(),
                board.title,
                board.caption,
                tags,
                board.background_color,
                board.canvas.width,
                board.canvas.height,
                board.has_margin,
                board.is_pinned,
                board.created_at,
                board.updated_at,
                board.sync_version,
            ],
        )?;

        tx.execute(
            "DELETE FROM board_images WHERE board_id = ?",
            params![board.id.as_str()],
        )?;

        for (position, image) in board.images.iter().enumerate() {
            tx.execute(
                "INSERT INTO board_images (board_id, id, position, hash, x, y, width, height,
                                           rotation, z_index, is_pinned, natural_width,
                                           natural_height, mime_type, data)
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
                params![
                    board.id.as_str(),
                    image.id,
                    i64::try_from(position).unwrap_or(i64::MAX),
                    image.hash.as_str(),
                    image.placement.x,
                    image.placement.y,
                    image.placement.width,
                    image.placement.height,
                    image.placement.rotation,
                    image.placement.z_index,
                    image.is_pinned,
                    image.natural_width,
                    image.natural_height,
                    image.mime_type,
                    image.data,
                ],
            )?;
        }

        tx.commit()?;
        Ok(())
    }

    fn delete(&self, id: &BoardId) -> Result<()> {
        let rows = self
            .conn
            .execute("DELETE FROM boards WHERE id = ?", params![id.as_str()])?;

        if rows == 0 {
            return Err(Error::NotFound(id.to_string()));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;
    use crate::hash::ContentHasher;
    use pretty_assertions::assert_eq;

    fn setup() -> Database {
        Database::open_in_memory().unwrap()
    }

    fn board_with_image(title: &str, bytes: Vec<u8>) -> Board {
        let mut board = Board::new(title);
        board.add_tag("inspo");
        let image =
            CanvasImageRef::from_bytes(bytes, "image/png", 64, 32, &ContentHasher::default())
                .unwrap();
        board.add_image(image);
        board
    }

    #[test]
    fn test_upsert_and_get() {
        let db = setup();
        let repo = SqliteBoardRepository::new(db.connection());

        let board = board_with_image("Kitchen", vec![1, 2, 3, 4]);
        repo.upsert(&board).unwrap();

        let fetched = repo.get(&board.id).unwrap().unwrap();
        assert_eq!(fetched, board);
        assert_eq!(fetched.images[0].data.as_deref(), Some(&[1, 2, 3, 4][..]));
    }

    #[test]
    fn test_upsert_replaces_existing_board() {
        let db = setup();
        let repo = SqliteBoardRepository::new(db.connection());

        let mut board = board_with_image("Before", vec![5; 10]);
        repo.upsert(&board).unwrap();

        board.title = "After".to_string();
        board.images.clear();
        board.sync_version = 4;
        repo.upsert(&board).unwrap();

        let fetched = repo.get(&board.id).unwrap().unwrap();
        assert_eq!(fetched.title, "After");
        assert!(fetched.images.is_empty());
        assert_eq!(fetched.sync_version, 4);
        assert_eq!(repo.list().unwrap().len(), 1);
    }

    #[test]
    fn test_list_orders_by_updated_at() {
        let db = setup();
        let repo = SqliteBoardRepository::new(db.connection());

        let mut older = Board::new("Older");
        older.updated_at = 1_000;
        let mut newer = Board::new("Newer");
        newer.updated_at = 2_000;
        repo.upsert(&older).unwrap();
        repo.upsert(&newer).unwrap();

        let boards = repo.list().unwrap();
        assert_eq!(boards.len(), 2);
        assert_eq!(boards[0].title, "Newer");
        assert_eq!(boards[1].title, "Older");
    }

    #[test]
    fn test_image_order_is_preserved() {
        let db = setup();
        let repo = SqliteBoardRepository::new(db.connection());
        let hasher = ContentHasher::default();

        let mut board = Board::new("Ordered");
        for seed in [3_u8, 1, 2] {
            board.add_image(
                CanvasImageRef::from_bytes(vec![seed; 8], "image/png", 1, 1, &hasher).unwrap(),
            );
        }
        repo.upsert(&board).unwrap();

        let fetched = repo.get(&board.id).unwrap().unwrap();
        let ids: Vec<_> = fetched.images.iter().map(|image| image.id.clone()).collect();
        let expected: Vec<_> = board.images.iter().map(|image| image.id.clone()).collect();
        assert_eq!(ids, expected);
    }

    #[test]
    fn test_delete() {
        let db = setup();
        let repo = SqliteBoardRepository::new(db.connection());

        let board = board_with_image("To delete", vec![9; 4]);
        repo.upsert(&board).unwrap();
        repo.delete(&board.id).unwrap();

        assert!(repo.get(&board.id).unwrap().is_none());
        let orphaned: i64 = db
            .connection()
            .query_row("SELECT COUNT(*) FROM board_images", [], |row| row.get(0))
            .unwrap();
        assert_eq!(orphaned, 0);

        assert!(matches!(repo.delete(&board.id), Err(Error::NotFound(_))));
    }
}
