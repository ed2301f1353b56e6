use crate::domain::note::{ClientNote, NewClientNote};
use crate::repo::booking_store::NoteBook;
use anyhow::Result;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};

#[derive(Clone)]
pub struct NotesRepo {
    pub pool: PgPool,
}

fn note_from_row(r: &PgRow) -> ClientNote {
    ClientNote {
        id: r.get("id"),
        user_email: r.get("user_email"),
        title: r.get("title"),
        content: r.get("content"),
        created_at: r.get("created_at"),
    }
}

#[async_trait::async_trait]
impl NoteBook for NotesRepo {
    async fn publish(&self, note: NewClientNote) -> Result<ClientNote> {
        let row = sqlx::query(
            r#"
            INSERT INTO client_notes (user_email, title, content)
            VALUES ($1, $2, $3)
            RETURNING id, user_email, title, content, created_at
            "#,
        )
        .bind(&note.user_email)
        .bind(&note.title)
        .bind(&note.content)
        .fetch_one(&self.pool)
        .await?;

        Ok(note_from_row(&row))
    }

    async fn list_for(&self, user_email: &str) -> Result<Vec<ClientNote>> {
        let rows = sqlx::query(
            r#"
            SELECT id, user_email, title, content, created_at
            FROM client_notes
            WHERE user_email = $1
            ORDER BY created_at DESC, id DESC
            "#,
        )
        .bind(user_email)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(note_from_row).collect())
    }
}
