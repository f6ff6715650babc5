use std::path::Path;
use std::sync::Mutex;

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{Connection, OptionalExtension, Row, params};

use super::Store;
use super::schema::SCHEMA;
use crate::error::{Error, Result};
use crate::query::{Page, PageRequest, PhotoFilter};
use crate::types::*;

const PHOTO_COLUMNS: &str = "p.id, p.public_id, p.title, p.tags, p.object_key, p.aspect_ratio, \
                             p.download_count, p.is_featured, p.created_at";

const COLLECTION_COLUMNS: &str = "c.id, c.title, c.description, c.slug, c.cover_photo_id, \
                                  c.is_published, c.view_count, c.created_at, c.updated_at";

const USER_COLUMNS: &str = "id, username, password_hash, role, created_at";

const TOKEN_COLUMNS: &str =
    "id, token_hash, token_lookup, user_id, created_at, expires_at, last_used_at";

pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    pub fn new<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let conn = Connection::open(db_path)?;

        conn.pragma_update(None, "foreign_keys", "ON")?;
        conn.pragma_update(None, "journal_mode", "WAL")?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Opens a private in-memory database, mostly for tests.
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.pragma_update(None, "foreign_keys", "ON")?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> std::sync::MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|e| e.into_inner())
    }
}

fn parse_datetime(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .or_else(|_| {
            // Handle SQLite's default datetime format: "YYYY-MM-DD HH:MM:SS"
            chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").map(|ndt| ndt.and_utc())
        })
        .unwrap_or_else(|e| {
            tracing::error!("Invalid datetime in database: '{}' - {}", s, e);
            Utc::now()
        })
}

/// Fixed-width so that text ordering matches time ordering.
fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Escapes `LIKE` wildcards so a needle matches literally under `ESCAPE '\'`.
fn escape_like(needle: &str) -> String {
    let mut out = String::with_capacity(needle.len());
    for c in needle.chars() {
        if matches!(c, '\\' | '%' | '_') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

fn is_unique_violation(e: &rusqlite::Error) -> bool {
    matches!(
        e,
        rusqlite::Error::SqliteFailure(err, _)
            if err.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
                || err.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY
    )
}

fn map_unique(e: rusqlite::Error) -> Error {
    if is_unique_violation(&e) {
        Error::AlreadyExists
    } else {
        Error::from(e)
    }
}

fn photo_from_row(row: &Row<'_>) -> rusqlite::Result<Photo> {
    Ok(Photo {
        id: row.get(0)?,
        public_id: row.get(1)?,
        title: row.get(2)?,
        tags: decode_tags(&row.get::<_, String>(3)?),
        object_key: row.get(4)?,
        aspect_ratio: row.get(5)?,
        download_count: row.get(6)?,
        is_featured: row.get(7)?,
        created_at: parse_datetime(&row.get::<_, String>(8)?),
    })
}

fn collection_from_row(row: &Row<'_>) -> rusqlite::Result<Collection> {
    Ok(Collection {
        id: row.get(0)?,
        title: row.get(1)?,
        description: row.get(2)?,
        slug: row.get(3)?,
        cover_photo_id: row.get(4)?,
        is_published: row.get(5)?,
        view_count: row.get(6)?,
        created_at: parse_datetime(&row.get::<_, String>(7)?),
        updated_at: parse_datetime(&row.get::<_, String>(8)?),
    })
}

fn user_from_row(row: &Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        username: row.get(1)?,
        password_hash: row.get(2)?,
        role: row.get(3)?,
        created_at: parse_datetime(&row.get::<_, String>(4)?),
    })
}

fn token_from_row(row: &Row<'_>) -> rusqlite::Result<Token> {
    Ok(Token {
        id: row.get(0)?,
        token_hash: row.get(1)?,
        token_lookup: row.get(2)?,
        user_id: row.get(3)?,
        created_at: parse_datetime(&row.get::<_, String>(4)?),
        expires_at: row.get::<_, Option<String>>(5)?.map(|s| parse_datetime(&s)),
        last_used_at: row.get::<_, Option<String>>(6)?.map(|s| parse_datetime(&s)),
    })
}

/// Points `photo_tags` at the tags named in the photo's list, creating
/// missing tags.
fn sync_photo_tags(conn: &Connection, photo_id: &str, tags: &[String]) -> rusqlite::Result<()> {
    conn.execute("DELETE FROM photo_tags WHERE photo_id = ?1", params![photo_id])?;

    for name in tags {
        conn.execute(
            "INSERT OR IGNORE INTO tags (name) VALUES (?1)",
            params![name],
        )?;
        conn.execute(
            "INSERT OR IGNORE INTO photo_tags (photo_id, tag_id)
             SELECT ?1, id FROM tags WHERE name = ?2",
            params![photo_id, name],
        )?;
    }
    Ok(())
}

/// Rewrites the tag list of every photo linked to `tag_id`.
fn rewrite_tagged_photos<F>(conn: &Connection, tag_id: i64, mut rewrite: F) -> rusqlite::Result<()>
where
    F: FnMut(Vec<String>) -> Vec<String>,
{
    let tagged: Vec<(String, String)> = {
        let mut stmt = conn.prepare(
            "SELECT p.id, p.tags FROM photos p
             JOIN photo_tags pt ON pt.photo_id = p.id
             WHERE pt.tag_id = ?1",
        )?;
        let rows = stmt.query_map(params![tag_id], |row| Ok((row.get(0)?, row.get(1)?)))?;
        rows.collect::<rusqlite::Result<Vec<_>>>()?
    };

    for (photo_id, encoded) in tagged {
        let tags = rewrite(decode_tags(&encoded));
        conn.execute(
            "UPDATE photos SET tags = ?1 WHERE id = ?2",
            params![encode_tags(&tags), photo_id],
        )?;
    }
    Ok(())
}

impl Store for SqliteStore {
    fn initialize(&self) -> Result<()> {
        self.conn().execute_batch(SCHEMA)?;
        Ok(())
    }

    // Photo operations

    fn create_photo(&self, photo: &Photo) -> Result<()> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;

        tx.execute(
            "INSERT INTO photos (id, public_id, title, tags, object_key, aspect_ratio,
                                 download_count, is_featured, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                photo.id,
                photo.public_id,
                photo.title,
                encode_tags(&photo.tags),
                photo.object_key,
                photo.aspect_ratio,
                photo.download_count,
                photo.is_featured,
                format_datetime(&photo.created_at),
            ],
        )
        .map_err(map_unique)?;

        sync_photo_tags(&tx, &photo.id, &photo.tags)?;

        tx.commit()?;
        Ok(())
    }

    fn get_photo(&self, id: &str) -> Result<Option<Photo>> {
        let conn = self.conn();
        conn.query_row(
            &format!("SELECT {PHOTO_COLUMNS} FROM photos p WHERE p.id = ?1"),
            params![id],
            photo_from_row,
        )
        .optional()
        .map_err(Error::from)
    }

    fn get_photo_by_public_id(&self, public_id: &str) -> Result<Option<Photo>> {
        let conn = self.conn();
        conn.query_row(
            &format!("SELECT {PHOTO_COLUMNS} FROM photos p WHERE p.public_id = ?1"),
            params![public_id],
            photo_from_row,
        )
        .optional()
        .map_err(Error::from)
    }

    fn get_photo_by_object_key(&self, object_key: &str) -> Result<Option<Photo>> {
        let conn = self.conn();
        conn.query_row(
            &format!("SELECT {PHOTO_COLUMNS} FROM photos p WHERE p.object_key = ?1"),
            params![object_key],
            photo_from_row,
        )
        .optional()
        .map_err(Error::from)
    }

    fn list_photos(&self, filter: &PhotoFilter, page: PageRequest) -> Result<Page<Photo>> {
        if filter.is_empty() {
            return self.find_photos(None, page);
        }

        // Tag filters apply to the decoded list, so matching happens here
        // rather than with LIKE on the encoded column.
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!(
            "SELECT {PHOTO_COLUMNS} FROM photos p ORDER BY p.created_at DESC, p.rowid DESC"
        ))?;

        let photos = stmt
            .query_map([], photo_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let matching: Vec<Photo> = photos.into_iter().filter(|p| filter.matches(p)).collect();
        Ok(page.slice(matching))
    }

    fn find_photos(&self, needle: Option<&str>, page: PageRequest) -> Result<Page<Photo>> {
        let conn = self.conn();
        let pattern = needle
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .map(|n| format!("%{}%", escape_like(n)));

        let total: i64 = conn.query_row(
            "SELECT COUNT(*) FROM photos p
             WHERE ?1 IS NULL OR p.title LIKE ?1 ESCAPE '\\' OR p.public_id LIKE ?1 ESCAPE '\\'",
            params![pattern],
            |row| row.get(0),
        )?;

        let mut stmt = conn.prepare(&format!(
            "SELECT {PHOTO_COLUMNS} FROM photos p
             WHERE ?1 IS NULL OR p.title LIKE ?1 ESCAPE '\\' OR p.public_id LIKE ?1 ESCAPE '\\'
             ORDER BY p.created_at DESC, p.rowid DESC
             LIMIT ?2 OFFSET ?3"
        ))?;

        let items = stmt
            .query_map(params![pattern, page.limit, page.offset()], photo_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(Page::new(items, total, page))
    }

    fn update_photo(&self, photo: &Photo) -> Result<()> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;

        let rows = tx
            .execute(
                "UPDATE photos SET title = ?1, tags = ?2, object_key = ?3, aspect_ratio = ?4,
                                   is_featured = ?5
                 WHERE id = ?6",
                params![
                    photo.title,
                    encode_tags(&photo.tags),
                    photo.object_key,
                    photo.aspect_ratio,
                    photo.is_featured,
                    photo.id,
                ],
            )
            .map_err(map_unique)?;

        if rows == 0 {
            return Err(Error::NotFound);
        }

        sync_photo_tags(&tx, &photo.id, &photo.tags)?;

        tx.commit()?;
        Ok(())
    }

    fn record_download(&self, public_id: &str) -> Result<Option<i64>> {
        let conn = self.conn();
        conn.query_row(
            "UPDATE photos SET download_count = download_count + 1
             WHERE public_id = ?1
             RETURNING download_count",
            params![public_id],
            |row| row.get(0),
        )
        .optional()
        .map_err(Error::from)
    }

    fn most_downloaded_photos(&self, limit: i64) -> Result<Vec<Photo>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!(
            "SELECT {PHOTO_COLUMNS} FROM photos p
             ORDER BY p.download_count DESC, p.created_at DESC
             LIMIT ?1"
        ))?;

        let rows = stmt.query_map(params![limit], photo_from_row)?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    // Tag operations

    fn create_tag(&self, name: &str, description: Option<&str>) -> Result<Tag> {
        let conn = self.conn();
        conn.execute(
            "INSERT INTO tags (name, description) VALUES (?1, ?2)",
            params![name, description],
        )
        .map_err(map_unique)?;

        Ok(Tag {
            id: conn.last_insert_rowid(),
            name: name.to_string(),
            description: description.map(str::to_string),
        })
    }

    fn get_tag(&self, id: i64) -> Result<Option<Tag>> {
        let conn = self.conn();
        conn.query_row(
            "SELECT id, name, description FROM tags WHERE id = ?1",
            params![id],
            |row| {
                Ok(Tag {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    description: row.get(2)?,
                })
            },
        )
        .optional()
        .map_err(Error::from)
    }

    fn get_tag_by_name(&self, name: &str) -> Result<Option<Tag>> {
        let conn = self.conn();
        conn.query_row(
            "SELECT id, name, description FROM tags WHERE name = ?1",
            params![name],
            |row| {
                Ok(Tag {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    description: row.get(2)?,
                })
            },
        )
        .optional()
        .map_err(Error::from)
    }

    fn list_tags(&self) -> Result<Vec<TagWithCount>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT t.id, t.name, t.description,
                    (SELECT COUNT(*) FROM photo_tags pt WHERE pt.tag_id = t.id)
             FROM tags t ORDER BY t.name",
        )?;

        let rows = stmt.query_map([], |row| {
            Ok(TagWithCount {
                tag: Tag {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    description: row.get(2)?,
                },
                photo_count: row.get(3)?,
            })
        })?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn update_tag(&self, tag: &Tag) -> Result<()> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;

        let old_name: String = tx
            .query_row(
                "SELECT name FROM tags WHERE id = ?1",
                params![tag.id],
                |row| row.get(0),
            )
            .optional()?
            .ok_or(Error::NotFound)?;

        tx.execute(
            "UPDATE tags SET name = ?1, description = ?2 WHERE id = ?3",
            params![tag.name, tag.description, tag.id],
        )
        .map_err(map_unique)?;

        if old_name != tag.name {
            rewrite_tagged_photos(&tx, tag.id, |tags| {
                normalize_tags(tags.iter().map(|t| {
                    if *t == old_name { tag.name.as_str() } else { t.as_str() }
                }))
            })?;
        }

        tx.commit()?;
        Ok(())
    }

    fn delete_tag(&self, id: i64) -> Result<bool> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;

        let Some(name) = tx
            .query_row("SELECT name FROM tags WHERE id = ?1", params![id], |row| {
                row.get::<_, String>(0)
            })
            .optional()?
        else {
            return Ok(false);
        };

        rewrite_tagged_photos(&tx, id, |tags| tags.into_iter().filter(|t| *t != name).collect())?;

        let rows = tx.execute("DELETE FROM tags WHERE id = ?1", params![id])?;

        tx.commit()?;
        Ok(rows > 0)
    }

    fn count_tag_photos(&self, id: i64) -> Result<i64> {
        let conn = self.conn();
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM photo_tags WHERE tag_id = ?1",
            params![id],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    // Collection operations

    fn create_collection(&self, collection: &Collection) -> Result<()> {
        self.conn()
            .execute(
                "INSERT INTO collections (id, title, description, slug, cover_photo_id,
                                          is_published, view_count, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                params![
                    collection.id,
                    collection.title,
                    collection.description,
                    collection.slug,
                    collection.cover_photo_id,
                    collection.is_published,
                    collection.view_count,
                    format_datetime(&collection.created_at),
                    format_datetime(&collection.updated_at),
                ],
            )
            .map_err(map_unique)?;
        Ok(())
    }

    fn get_collection(&self, id: &str) -> Result<Option<Collection>> {
        let conn = self.conn();
        conn.query_row(
            &format!("SELECT {COLLECTION_COLUMNS} FROM collections c WHERE c.id = ?1"),
            params![id],
            collection_from_row,
        )
        .optional()
        .map_err(Error::from)
    }

    fn get_collection_by_slug(&self, slug: &str) -> Result<Option<Collection>> {
        let conn = self.conn();
        conn.query_row(
            &format!("SELECT {COLLECTION_COLUMNS} FROM collections c WHERE c.slug = ?1"),
            params![slug],
            collection_from_row,
        )
        .optional()
        .map_err(Error::from)
    }

    fn list_collections(
        &self,
        published_only: bool,
        page: PageRequest,
    ) -> Result<Page<CollectionWithCount>> {
        let conn = self.conn();

        let total: i64 = conn.query_row(
            "SELECT COUNT(*) FROM collections c
             WHERE ?1 = 0 OR lower(c.is_published) = 'true'",
            params![published_only],
            |row| row.get(0),
        )?;

        let mut stmt = conn.prepare(&format!(
            "SELECT {COLLECTION_COLUMNS},
                    (SELECT COUNT(*) FROM collection_photos cp WHERE cp.collection_id = c.id)
             FROM collections c
             WHERE ?1 = 0 OR lower(c.is_published) = 'true'
             ORDER BY c.created_at DESC, c.rowid DESC
             LIMIT ?2 OFFSET ?3"
        ))?;

        let items = stmt
            .query_map(params![published_only, page.limit, page.offset()], |row| {
                Ok(CollectionWithCount {
                    collection: collection_from_row(row)?,
                    photo_count: row.get(9)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(Page::new(items, total, page))
    }

    fn update_collection(&self, collection: &Collection) -> Result<()> {
        let rows = self
            .conn()
            .execute(
                "UPDATE collections SET title = ?1, description = ?2, slug = ?3,
                        cover_photo_id = ?4, is_published = ?5, updated_at = ?6
                 WHERE id = ?7",
                params![
                    collection.title,
                    collection.description,
                    collection.slug,
                    collection.cover_photo_id,
                    collection.is_published,
                    format_datetime(&collection.updated_at),
                    collection.id,
                ],
            )
            .map_err(map_unique)?;

        if rows == 0 {
            return Err(Error::NotFound);
        }
        Ok(())
    }

    fn delete_collection(&self, id: &str) -> Result<bool> {
        let rows = self
            .conn()
            .execute("DELETE FROM collections WHERE id = ?1", params![id])?;
        Ok(rows > 0)
    }

    fn record_collection_view(&self, id: &str) -> Result<Option<i64>> {
        let conn = self.conn();
        conn.query_row(
            "UPDATE collections SET view_count = view_count + 1
             WHERE id = ?1
             RETURNING view_count",
            params![id],
            |row| row.get(0),
        )
        .optional()
        .map_err(Error::from)
    }

    // Collection-Photo M2M operations

    fn upsert_membership(&self, membership: &Membership) -> Result<()> {
        self.conn().execute(
            "INSERT INTO collection_photos (collection_id, photo_id, order_index)
             VALUES (?1, ?2, ?3)
             ON CONFLICT (collection_id, photo_id) DO UPDATE SET order_index = excluded.order_index",
            params![
                membership.collection_id,
                membership.photo_id,
                membership.order_index
            ],
        )?;
        Ok(())
    }

    fn remove_membership(&self, collection_id: &str, photo_id: &str) -> Result<bool> {
        let rows = self.conn().execute(
            "DELETE FROM collection_photos WHERE collection_id = ?1 AND photo_id = ?2",
            params![collection_id, photo_id],
        )?;
        Ok(rows > 0)
    }

    fn list_memberships(&self, collection_id: &str) -> Result<Vec<Membership>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT collection_id, photo_id, order_index FROM collection_photos
             WHERE collection_id = ?1
             ORDER BY order_index ASC, rowid ASC",
        )?;

        let rows = stmt.query_map(params![collection_id], |row| {
            Ok(Membership {
                collection_id: row.get(0)?,
                photo_id: row.get(1)?,
                order_index: row.get(2)?,
            })
        })?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn set_collection_photos(&self, collection_id: &str, photo_ids: &[String]) -> Result<()> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;

        tx.execute(
            "DELETE FROM collection_photos WHERE collection_id = ?1",
            params![collection_id],
        )?;

        for (index, photo_id) in photo_ids.iter().enumerate() {
            tx.execute(
                "INSERT INTO collection_photos (collection_id, photo_id, order_index)
                 VALUES (?1, ?2, ?3)",
                params![collection_id, photo_id, index as i64],
            )
            .map_err(map_unique)?;
        }

        tx.commit()?;
        Ok(())
    }

    fn list_collection_photos(&self, collection_id: &str) -> Result<Vec<Photo>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!(
            "SELECT {PHOTO_COLUMNS} FROM photos p
             JOIN collection_photos cp ON cp.photo_id = p.id
             WHERE cp.collection_id = ?1
             ORDER BY cp.order_index ASC, cp.rowid ASC"
        ))?;

        let rows = stmt.query_map(params![collection_id], photo_from_row)?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    // User operations

    fn create_user(&self, username: &str, password_hash: &str, role: &str) -> Result<User> {
        let conn = self.conn();
        let created_at = Utc::now();
        conn.execute(
            "INSERT INTO users (username, password_hash, role, created_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![username, password_hash, role, format_datetime(&created_at)],
        )
        .map_err(map_unique)?;

        Ok(User {
            id: conn.last_insert_rowid(),
            username: username.to_string(),
            password_hash: password_hash.to_string(),
            role: role.to_string(),
            created_at,
        })
    }

    fn get_user(&self, id: i64) -> Result<Option<User>> {
        let conn = self.conn();
        conn.query_row(
            &format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1"),
            params![id],
            user_from_row,
        )
        .optional()
        .map_err(Error::from)
    }

    fn get_user_by_username(&self, username: &str) -> Result<Option<User>> {
        let conn = self.conn();
        conn.query_row(
            &format!("SELECT {USER_COLUMNS} FROM users WHERE username = ?1"),
            params![username],
            user_from_row,
        )
        .optional()
        .map_err(Error::from)
    }

    fn list_users(&self) -> Result<Vec<User>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!("SELECT {USER_COLUMNS} FROM users ORDER BY id"))?;

        let rows = stmt.query_map([], user_from_row)?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn has_admin_user(&self) -> Result<bool> {
        let conn = self.conn();
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM users WHERE role = ?1",
            params![ROLE_ADMIN],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    // Token operations

    fn create_token(&self, token: &Token) -> Result<()> {
        let result = self.conn().execute(
            "INSERT INTO tokens (id, token_hash, token_lookup, user_id, created_at, expires_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                token.id,
                token.token_hash,
                token.token_lookup,
                token.user_id,
                format_datetime(&token.created_at),
                token.expires_at.as_ref().map(format_datetime),
            ],
        );

        match result {
            Ok(_) => Ok(()),
            Err(e) if is_unique_violation(&e) => Err(Error::TokenLookupCollision),
            Err(e) => Err(Error::from(e)),
        }
    }

    fn get_token_by_lookup(&self, lookup: &str) -> Result<Option<Token>> {
        let conn = self.conn();
        conn.query_row(
            &format!("SELECT {TOKEN_COLUMNS} FROM tokens WHERE token_lookup = ?1"),
            params![lookup],
            token_from_row,
        )
        .optional()
        .map_err(Error::from)
    }

    fn update_token_last_used(&self, id: &str) -> Result<()> {
        self.conn().execute(
            "UPDATE tokens SET last_used_at = ?1 WHERE id = ?2",
            params![format_datetime(&Utc::now()), id],
        )?;
        Ok(())
    }

    fn gallery_stats(&self) -> Result<GalleryStats> {
        let conn = self.conn();
        conn.query_row(
            "SELECT
                (SELECT COUNT(*) FROM photos),
                (SELECT COALESCE(SUM(download_count), 0) FROM photos),
                (SELECT COUNT(*) FROM photos WHERE lower(is_featured) = 'true'),
                (SELECT COUNT(*) FROM users),
                (SELECT COUNT(*) FROM tags),
                (SELECT COUNT(*) FROM collections),
                (SELECT COUNT(*) FROM collections WHERE lower(is_published) = 'true'),
                (SELECT COALESCE(SUM(view_count), 0) FROM collections)",
            [],
            |row| {
                Ok(GalleryStats {
                    total_photos: row.get(0)?,
                    total_downloads: row.get(1)?,
                    featured_photos: row.get(2)?,
                    total_users: row.get(3)?,
                    total_tags: row.get(4)?,
                    total_collections: row.get(5)?,
                    published_collections: row.get(6)?,
                    total_views: row.get(7)?,
                })
            },
        )
        .map_err(Error::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use tempfile::TempDir;

    fn store() -> SqliteStore {
        let store = SqliteStore::in_memory().unwrap();
        store.initialize().unwrap();
        store
    }

    fn photo(public_id: &str, tags: &[&str], age_minutes: i64) -> Photo {
        Photo {
            id: format!("id-{public_id}"),
            public_id: public_id.to_string(),
            title: format!("Photo {public_id}"),
            tags: tags.iter().map(|t| t.to_string()).collect(),
            object_key: format!("images/original/{public_id}.webp"),
            aspect_ratio: 1.5,
            download_count: 0,
            is_featured: "false".to_string(),
            created_at: Utc::now() - Duration::minutes(age_minutes),
        }
    }

    fn collection(id: &str, slug: &str, published: bool, age_minutes: i64) -> Collection {
        let at = Utc::now() - Duration::minutes(age_minutes);
        Collection {
            id: id.to_string(),
            title: format!("Collection {id}"),
            description: None,
            slug: slug.to_string(),
            cover_photo_id: None,
            is_published: if published { "true" } else { "false" }.to_string(),
            view_count: 0,
            created_at: at,
            updated_at: at,
        }
    }

    #[test]
    fn test_initialize_creates_tables() {
        let temp = TempDir::new().unwrap();
        let store = SqliteStore::new(temp.path().join("test.db")).unwrap();
        store.initialize().unwrap();
        // Re-running the schema is harmless
        store.initialize().unwrap();

        let conn = store.conn();
        let tables: Vec<String> = conn
            .prepare("SELECT name FROM sqlite_master WHERE type='table' ORDER BY name")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .collect::<std::result::Result<Vec<_>, _>>()
            .unwrap();

        for table in [
            "photos",
            "tags",
            "photo_tags",
            "collections",
            "collection_photos",
            "users",
            "tokens",
        ] {
            assert!(tables.contains(&table.to_string()), "missing {table}");
        }
    }

    #[test]
    fn test_photo_tags_round_trip_in_order() {
        let store = store();
        store.create_photo(&photo("p1", &["b", "a"], 0)).unwrap();

        let fetched = store.get_photo_by_public_id("p1").unwrap().unwrap();
        assert_eq!(fetched.tags, vec!["b", "a"]);
        assert!(store.get_photo_by_public_id("missing").unwrap().is_none());

        let tags = store.list_tags().unwrap();
        assert_eq!(tags.len(), 2);
        assert!(tags.iter().all(|t| t.photo_count == 1));
    }

    #[test]
    fn test_duplicate_public_id() {
        let store = store();
        store.create_photo(&photo("p1", &[], 0)).unwrap();

        let mut dup = photo("p1", &[], 0);
        dup.id = "other".to_string();
        dup.object_key = "images/original/other.webp".to_string();
        assert!(matches!(store.create_photo(&dup), Err(Error::AlreadyExists)));
    }

    #[test]
    fn test_list_photos_newest_first_and_paged() {
        let store = store();
        for i in 0..5 {
            store.create_photo(&photo(&format!("p{i}"), &[], i)).unwrap();
        }

        let page = store
            .list_photos(&PhotoFilter::default(), PageRequest::new(1, 2))
            .unwrap();
        assert_eq!(page.total, 5);
        assert_eq!(page.pages, 3);
        let ids: Vec<_> = page.items.iter().map(|p| p.public_id.as_str()).collect();
        assert_eq!(ids, vec!["p0", "p1"]);

        let past = store
            .list_photos(&PhotoFilter::default(), PageRequest::new(9, 2))
            .unwrap();
        assert!(past.items.is_empty());
        assert_eq!(past.total, 5);
        assert_eq!(past.pages, 3);
    }

    #[test]
    fn test_list_photos_filtered() {
        let store = store();
        store.create_photo(&photo("p1", &["solar", "green roof"], 0)).unwrap();
        store.create_photo(&photo("p2", &["solar"], 1)).unwrap();
        store.create_photo(&photo("p3", &["wind"], 2)).unwrap();

        let page = store
            .list_photos(&PhotoFilter::new(None, Some("SOLAR,green")), PageRequest::new(1, 10))
            .unwrap();
        assert_eq!(page.total, 1);
        assert_eq!(page.items[0].public_id, "p1");

        let none = store
            .list_photos(&PhotoFilter::new(None, Some("tidal")), PageRequest::new(1, 10))
            .unwrap();
        assert_eq!(none.total, 0);
        assert!(none.items.is_empty());

        let search = store
            .list_photos(&PhotoFilter::new(Some("photo p3"), None), PageRequest::new(1, 10))
            .unwrap();
        assert_eq!(search.total, 1);
    }

    #[test]
    fn test_get_photo_by_object_key() {
        let store = store();
        store.create_photo(&photo("p1", &[], 0)).unwrap();

        let found = store
            .get_photo_by_object_key("images/original/p1.webp")
            .unwrap()
            .unwrap();
        assert_eq!(found.public_id, "p1");
        assert!(
            store
                .get_photo_by_object_key("images/original/p2.webp")
                .unwrap()
                .is_none()
        );
    }

    #[test]
    fn test_find_photos_treats_wildcards_literally() {
        let store = store();
        let mut percent = photo("p1", &[], 0);
        percent.title = "100% solar".to_string();
        store.create_photo(&percent).unwrap();
        store.create_photo(&photo("p_2", &[], 1)).unwrap();
        store.create_photo(&photo("px2", &[], 2)).unwrap();

        let page = store.find_photos(Some("%"), PageRequest::new(1, 10)).unwrap();
        assert_eq!(page.total, 1);
        assert_eq!(page.items[0].public_id, "p1");

        let page = store.find_photos(Some("p_2"), PageRequest::new(1, 10)).unwrap();
        assert_eq!(page.total, 1);
        assert_eq!(page.items[0].public_id, "p_2");

        let page = store.find_photos(Some("SOLAR"), PageRequest::new(1, 10)).unwrap();
        assert_eq!(page.total, 1);
    }

    #[test]
    fn test_record_download() {
        let store = store();
        store.create_photo(&photo("p1", &[], 0)).unwrap();

        assert_eq!(store.record_download("p1").unwrap(), Some(1));
        assert_eq!(store.record_download("p1").unwrap(), Some(2));
        assert_eq!(store.record_download("nope").unwrap(), None);

        let fetched = store.get_photo_by_public_id("p1").unwrap().unwrap();
        assert_eq!(fetched.download_count, 2);
    }

    #[test]
    fn test_update_photo_keeps_public_id_and_counts() {
        let store = store();
        store.create_photo(&photo("p1", &["old"], 0)).unwrap();
        store.record_download("p1").unwrap();

        let mut edited = store.get_photo("id-p1").unwrap().unwrap();
        edited.public_id = "changed".to_string();
        edited.title = "New title".to_string();
        edited.tags = vec!["new".to_string()];
        edited.download_count = 0;
        store.update_photo(&edited).unwrap();

        let fetched = store.get_photo("id-p1").unwrap().unwrap();
        assert_eq!(fetched.public_id, "p1");
        assert_eq!(fetched.title, "New title");
        assert_eq!(fetched.download_count, 1);

        let old = store.get_tag_by_name("old").unwrap().unwrap();
        assert_eq!(store.count_tag_photos(old.id).unwrap(), 0);
    }

    #[test]
    fn test_rename_and_delete_tag_rewrites_photos() {
        let store = store();
        store.create_photo(&photo("p1", &["solar", "wind"], 0)).unwrap();

        let mut tag = store.get_tag_by_name("solar").unwrap().unwrap();
        tag.name = "sun".to_string();
        store.update_tag(&tag).unwrap();
        let fetched = store.get_photo("id-p1").unwrap().unwrap();
        assert_eq!(fetched.tags, vec!["sun", "wind"]);

        let wind = store.get_tag_by_name("wind").unwrap().unwrap();
        assert!(store.delete_tag(wind.id).unwrap());
        let fetched = store.get_photo("id-p1").unwrap().unwrap();
        assert_eq!(fetched.tags, vec!["sun"]);
        assert!(!store.delete_tag(wind.id).unwrap());
    }

    #[test]
    fn test_duplicate_tag_name() {
        let store = store();
        store.create_tag("solar", None).unwrap();
        assert!(matches!(
            store.create_tag("solar", Some("again")),
            Err(Error::AlreadyExists)
        ));
    }

    #[test]
    fn test_list_collections_counts_and_filters() {
        let store = store();
        store.create_photo(&photo("p1", &[], 0)).unwrap();
        store.create_photo(&photo("p2", &[], 1)).unwrap();
        store.create_collection(&collection("c1", "one", true, 2)).unwrap();
        store.create_collection(&collection("c2", "two", false, 1)).unwrap();
        store
            .set_collection_photos("c1", &["id-p1".to_string(), "id-p2".to_string()])
            .unwrap();

        let published = store.list_collections(true, PageRequest::new(1, 10)).unwrap();
        assert_eq!(published.total, 1);
        assert_eq!(published.items[0].collection.id, "c1");
        assert_eq!(published.items[0].photo_count, 2);

        let all = store.list_collections(false, PageRequest::new(1, 10)).unwrap();
        assert_eq!(all.total, 2);
        assert_eq!(all.items[0].collection.id, "c2");
    }

    #[test]
    fn test_collection_photos_follow_order_index() {
        let store = store();
        for id in ["a", "b", "c"] {
            store.create_photo(&photo(id, &[], 0)).unwrap();
        }
        store.create_collection(&collection("c1", "one", true, 0)).unwrap();

        for (photo_id, order_index) in [("id-a", 2), ("id-b", 0), ("id-c", 1)] {
            store
                .upsert_membership(&Membership {
                    collection_id: "c1".to_string(),
                    photo_id: photo_id.to_string(),
                    order_index,
                })
                .unwrap();
        }

        let ids: Vec<_> = store
            .list_collection_photos("c1")
            .unwrap()
            .into_iter()
            .map(|p| p.public_id)
            .collect();
        assert_eq!(ids, vec!["b", "c", "a"]);

        assert!(store.remove_membership("c1", "id-c").unwrap());
        assert_eq!(store.list_memberships("c1").unwrap().len(), 2);
    }

    #[test]
    fn test_record_collection_view() {
        let store = store();
        store.create_collection(&collection("c1", "one", true, 0)).unwrap();

        assert_eq!(store.record_collection_view("c1").unwrap(), Some(1));
        assert_eq!(store.record_collection_view("c1").unwrap(), Some(2));
        assert_eq!(store.record_collection_view("zz").unwrap(), None);
    }

    #[test]
    fn test_duplicate_slug() {
        let store = store();
        store.create_collection(&collection("c1", "same", true, 0)).unwrap();
        assert!(matches!(
            store.create_collection(&collection("c2", "same", true, 0)),
            Err(Error::AlreadyExists)
        ));
    }

    #[test]
    fn test_token_lookup_collision() {
        let store = store();
        let user = store.create_user("admin", "hash", ROLE_ADMIN).unwrap();

        let token = |id: &str| Token {
            id: id.to_string(),
            token_hash: "hash".to_string(),
            token_lookup: "lookup12".to_string(),
            user_id: user.id,
            created_at: Utc::now(),
            expires_at: None,
            last_used_at: None,
        };
        store.create_token(&token("token-1")).unwrap();

        let result = store.create_token(&token("token-2"));
        assert!(matches!(result, Err(Error::TokenLookupCollision)));
    }

    #[test]
    fn test_users() {
        let store = store();
        assert!(!store.has_admin_user().unwrap());

        let user = store.create_user("admin", "hash", ROLE_ADMIN).unwrap();
        assert!(store.has_admin_user().unwrap());
        assert_eq!(store.get_user(user.id).unwrap().unwrap().username, "admin");
        assert!(matches!(
            store.create_user("admin", "hash", ROLE_ADMIN),
            Err(Error::AlreadyExists)
        ));
    }

    #[test]
    fn test_gallery_stats() {
        let store = store();
        let mut featured = photo("p1", &["solar"], 0);
        featured.is_featured = "True".to_string();
        store.create_photo(&featured).unwrap();
        store.create_photo(&photo("p2", &[], 0)).unwrap();
        store.record_download("p1").unwrap();
        store.record_download("p2").unwrap();
        store.record_download("p2").unwrap();

        let stats = store.gallery_stats().unwrap();
        assert_eq!(stats.total_photos, 2);
        assert_eq!(stats.total_downloads, 3);
        assert_eq!(stats.featured_photos, 1);
        assert_eq!(stats.total_tags, 1);

        let top = store.most_downloaded_photos(1).unwrap();
        assert_eq!(top[0].public_id, "p2");
    }
}
