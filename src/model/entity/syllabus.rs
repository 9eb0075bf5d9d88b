use serde::{Deserialize, Serialize};
use sqlx::prelude::FromRow;
use sqlx::{Postgres, Transaction};
use uuid::Uuid;

use crate::model::{DatabaseResult, ModelManager};

#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct SyllabusItemCreate {
    pub content: String,
    pub position: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct SyllabusSectionCreate {
    pub title: String,
    pub position: i32,
    #[serde(default)]
    pub items: Vec<SyllabusItemCreate>,
}

#[derive(Debug, FromRow)]
struct SyllabusRow {
    section_id: Uuid,
    title: String,
    section_position: i32,
    item_id: Option<Uuid>,
    content: Option<String>,
    item_position: Option<i32>,
}

#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct SyllabusItem {
    pub id: Uuid,
    pub content: String,
    pub position: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct SyllabusSection {
    pub id: Uuid,
    pub title: String,
    pub position: i32,
    pub items: Vec<SyllabusItem>,
}

impl SyllabusSection {
    /// Sections of a course ordered by position, items nested in order.
    pub async fn for_course(mm: &ModelManager, course_id: Uuid) -> DatabaseResult<Vec<Self>> {
        let rows: Vec<SyllabusRow> = sqlx::query_as(
            "SELECT s.id AS section_id, s.title, s.position AS section_position, \
             i.id AS item_id, i.content, i.position AS item_position \
             FROM syllabus_sections s \
             LEFT JOIN syllabus_items i ON i.section_id = s.id \
             WHERE s.course_id = $1 \
             ORDER BY s.position, i.position",
        )
        .bind(course_id)
        .fetch_all(mm.executor())
        .await?;

        Ok(group_rows(rows))
    }

    /// Deletes the syllabus of `course_id` and inserts `sections` in its place.
    pub async fn replace_for_course(
        tx: &mut Transaction<'static, Postgres>,
        course_id: Uuid,
        sections: &[SyllabusSectionCreate],
    ) -> DatabaseResult<()> {
        sqlx::query("DELETE FROM syllabus_sections WHERE course_id = $1")
            .bind(course_id)
            .execute(&mut **tx)
            .await?;

        for section in sections {
            let section_id = Uuid::new_v4();
            sqlx::query(
                "INSERT INTO syllabus_sections (id, course_id, title, position) VALUES ($1,$2,$3,$4)",
            )
            .bind(section_id)
            .bind(course_id)
            .bind(&section.title)
            .bind(section.position)
            .execute(&mut **tx)
            .await?;

            for item in &section.items {
                sqlx::query(
                    "INSERT INTO syllabus_items (id, section_id, content, position) VALUES ($1,$2,$3,$4)",
                )
                .bind(Uuid::new_v4())
                .bind(section_id)
                .bind(&item.content)
                .bind(item.position)
                .execute(&mut **tx)
                .await?;
            }
        }

        Ok(())
    }
}

fn group_rows(rows: Vec<SyllabusRow>) -> Vec<SyllabusSection> {
    let mut sections: Vec<SyllabusSection> = Vec::new();

    for row in rows {
        let is_new = sections.last().is_none_or(|s| s.id != row.section_id);
        if is_new {
            sections.push(SyllabusSection {
                id: row.section_id,
                title: row.title,
                position: row.section_position,
                items: Vec::new(),
            });
        }

        if let (Some(id), Some(content), Some(position), Some(section)) =
            (row.item_id, row.content, row.item_position, sections.last_mut())
        {
            section.items.push(SyllabusItem {
                id,
                content,
                position,
            });
        }
    }

    sections
}

#[cfg(test)]
mod test {
    use super::*;

    fn row(section: Uuid, position: i32, item: Option<(&str, i32)>) -> SyllabusRow {
        SyllabusRow {
            section_id: section,
            title: format!("Section {position}"),
            section_position: position,
            item_id: item.map(|_| Uuid::new_v4()),
            content: item.map(|(c, _)| c.to_string()),
            item_position: item.map(|(_, p)| p),
        }
    }

    #[test]
    fn rows_are_grouped_by_section() {
        let first = Uuid::new_v4();
        let second = Uuid::new_v4();
        let rows = vec![
            row(first, 0, Some(("Ownership", 0))),
            row(first, 0, Some(("Borrowing", 1))),
            row(second, 1, None),
        ];

        let sections = group_rows(rows);
        assert_eq!(sections.len(), 2);
        assert_eq!(sections[0].items.len(), 2);
        assert_eq!(sections[0].items[1].content, "Borrowing");
        assert!(sections[1].items.is_empty());
    }
}
