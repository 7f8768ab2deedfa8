use crate::rows::PromptRow;
use crate::{Store, StoreError};
use kibotos_types::{CategoryCount, Prompt};

impl Store {
    /// Lists active prompts, optionally filtered to one category.
    pub async fn list_prompts(&self, category: Option<&str>) -> Result<Vec<Prompt>, StoreError> {
        let rows = match category {
            Some(category) => {
                sqlx::query_as::<_, PromptRow>(
                    r#"
SELECT id, category, task, scenario, requirements, weight, active, created_at
FROM prompts WHERE active = TRUE AND category = $1
ORDER BY id
                    "#,
                )
                .bind(category)
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query_as::<_, PromptRow>(
                    r#"
SELECT id, category, task, scenario, requirements, weight, active, created_at
FROM prompts WHERE active = TRUE
ORDER BY id
                    "#,
                )
                .fetch_all(&self.pool)
                .await?
            }
        };

        rows.into_iter()
            .map(Prompt::try_from)
            .collect::<Result<Vec<_>, _>>()
            .map_err(StoreError::Domain)
    }

    pub async fn get_prompt(&self, id: &str) -> Result<Option<Prompt>, StoreError> {
        let row = sqlx::query_as::<_, PromptRow>(
            r#"
SELECT id, category, task, scenario, requirements, weight, active, created_at
FROM prompts WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Prompt::try_from).transpose().map_err(StoreError::Domain)
    }

    /// Creates a prompt. Mounted behind the admin-token-gated
    /// `POST /v1/admin/prompts` route.
    pub async fn create_prompt(&self, prompt: &Prompt) -> Result<Prompt, StoreError> {
        let requirements = serde_json::to_value(&prompt.requirements)
            .map_err(|e| StoreError::Domain(kibotos_types::KibotosError::Internal(e.to_string())))?;

        let row = sqlx::query_as::<_, PromptRow>(
            r#"
INSERT INTO prompts (id, category, task, scenario, requirements, weight, active)
VALUES ($1, $2, $3, $4, $5, $6, $7)
RETURNING id, category, task, scenario, requirements, weight, active, created_at
            "#,
        )
        .bind(&prompt.id)
        .bind(&prompt.category)
        .bind(&prompt.task)
        .bind(&prompt.scenario)
        .bind(requirements)
        .bind(prompt.weight)
        .bind(prompt.active)
        .fetch_one(&self.pool)
        .await?;

        Ok(Prompt::try_from(row)?)
    }

    /// Distinct prompt categories with a count of prompts in each, for
    /// `GET /v1/prompts/categories`.
    pub async fn list_prompt_categories(&self) -> Result<Vec<CategoryCount>, StoreError> {
        let rows: Vec<(String, i64)> = sqlx::query_as(
            r#"
SELECT category, count(*) FROM prompts GROUP BY category ORDER BY category
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(category, count)| CategoryCount { category, count })
            .collect())
    }
}
