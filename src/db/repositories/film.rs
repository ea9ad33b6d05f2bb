//! Storage shape of the film library: thematics, movies and movie images

use anyhow::Result;

use super::entity::{Entity, RowReader, SqlValue};
use crate::models::{Movie, MovieImage, Thematic};

impl Entity for Thematic {
    const TABLE: &'static str = "thematics";
    const SELECT: &'static str = "SELECT t.id, t.name, t.slug FROM thematics t";
    const COLUMNS: &'static [&'static str] = &["name", "slug"];

    fn id(&self) -> i64 {
        self.id
    }

    fn values(&self) -> Vec<SqlValue> {
        vec![
            SqlValue::Text(self.name.clone()),
            SqlValue::Text(self.slug.clone()),
        ]
    }

    fn from_row(row: &dyn RowReader) -> Result<Self> {
        Ok(Self {
            id: row.int("id")?,
            name: row.text("name")?,
            slug: row.text("slug")?,
        })
    }
}

impl Entity for Movie {
    const TABLE: &'static str = "movies";
    const SELECT: &'static str = r#"
        SELECT t.id, t.name, t.slug, t.description, t.date, t.thematic_id,
               th.name AS thematic_name
        FROM movies t
        LEFT JOIN thematics th ON th.id = t.thematic_id"#;
    const COLUMNS: &'static [&'static str] =
        &["name", "slug", "description", "date", "thematic_id"];
    const PARENT_COLUMN: Option<&'static str> = Some("thematic_id");
    const SEARCH_COLUMN: Option<&'static str> = Some("name");

    fn id(&self) -> i64 {
        self.id
    }

    fn values(&self) -> Vec<SqlValue> {
        vec![
            SqlValue::Text(self.name.clone()),
            SqlValue::Text(self.slug.clone()),
            SqlValue::Text(self.description.clone()),
            SqlValue::Timestamp(self.date),
            SqlValue::Int(self.thematic_id),
        ]
    }

    fn from_row(row: &dyn RowReader) -> Result<Self> {
        Ok(Self {
            id: row.int("id")?,
            name: row.text("name")?,
            slug: row.text("slug")?,
            description: row.text("description")?,
            date: row.timestamp("date")?,
            thematic_id: row.int("thematic_id")?,
            thematic_name: row.opt_text("thematic_name")?,
        })
    }
}

impl Entity for MovieImage {
    const TABLE: &'static str = "movie_images";
    const SELECT: &'static str = "SELECT t.id, t.name, t.movie_id FROM movie_images t";
    const COLUMNS: &'static [&'static str] = &["name", "movie_id"];
    const PARENT_COLUMN: Option<&'static str> = Some("movie_id");

    fn id(&self) -> i64 {
        self.id
    }

    fn values(&self) -> Vec<SqlValue> {
        vec![
            SqlValue::OptText(self.name.clone()),
            SqlValue::Int(self.movie_id),
        ]
    }

    fn from_row(row: &dyn RowReader) -> Result<Self> {
        Ok(Self {
            id: row.int("id")?,
            name: row.opt_text("name")?,
            movie_id: row.int("movie_id")?,
        })
    }
}
